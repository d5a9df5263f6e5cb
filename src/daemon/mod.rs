mod events;

pub use events::{EventBus, DEFAULT_BUFFER};

use crate::menu::MenuTag;
use crate::tray::IconId;
use serde::Serialize;

/// Lifecycle notifications for observers of the tray.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TrayEvent {
    Attached { icon: IconId },
    Detached { icon: IconId },
    AttachFailed { icon: IconId, reason: String },
    MenuItemSelected { icon: IconId, tag: MenuTag },
    Activated { icon: IconId },
    Disposed { icons: usize },
}
