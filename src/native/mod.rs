//! Boundary to the host's status bar.
//!
//! Everything the tray core needs from the operating system goes through
//! [`StatusBar`]. Implementations must be callable from any thread; the core
//! decides which thread a given call is issued from.

pub mod recording;

pub use recording::{NativeCall, NativeOp, RecordingStatusBar};

use crate::error::NativeError;
use crate::tray::icon::NativeImage;
use crate::tray::IconId;
use serde::Serialize;

/// Opaque token for a native status item.
///
/// Only meaningful to the [`StatusBar`] that issued it. [`NativeHandle::INVALID`]
/// marks "no peer".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NativeHandle(u64);

impl NativeHandle {
    pub const INVALID: NativeHandle = NativeHandle(0);

    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }

    pub fn is_valid(self) -> bool {
        self != Self::INVALID
    }
}

/// Screen-space rectangle of a status item, origin at the item's corner.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ScreenFrame {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MouseEventKind {
    LeftDown,
    LeftUp,
    RightDown,
    RightUp,
    Other,
}

impl MouseEventKind {
    pub fn is_press(self) -> bool {
        matches!(self, MouseEventKind::LeftDown | MouseEventKind::RightDown)
    }
}

/// What the target platform's status bar can do, fixed at build time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub balloon_messages: bool,
    pub template_images: bool,
    pub always_on_top_popups: bool,
}

#[cfg(target_os = "macos")]
pub const CAPABILITIES: Capabilities = Capabilities {
    balloon_messages: false,
    template_images: true,
    always_on_top_popups: true,
};

#[cfg(not(target_os = "macos"))]
pub const CAPABILITIES: Capabilities = Capabilities {
    balloon_messages: false,
    template_images: false,
    always_on_top_popups: true,
};

pub trait StatusBar: Send + Sync {
    /// Creates a status item and adds it to the bar. Callbacks for it are
    /// reported under `icon`.
    fn create(&self, icon: IconId) -> Result<NativeHandle, NativeError>;

    /// Removes the item from the bar and frees everything it holds.
    fn destroy(&self, handle: NativeHandle) -> Result<(), NativeError>;

    fn set_title(&self, handle: NativeHandle, title: &str) -> Result<(), NativeError>;

    fn set_tooltip(&self, handle: NativeHandle, tooltip: &str) -> Result<(), NativeError>;

    fn set_image(&self, handle: NativeHandle, image: &NativeImage) -> Result<(), NativeError>;

    fn set_highlighted(&self, handle: NativeHandle, highlighted: bool) -> Result<(), NativeError>;

    fn screen_frame(&self, handle: NativeHandle) -> Result<ScreenFrame, NativeError>;

    fn add_menu_item(
        &self,
        handle: NativeHandle,
        label: &str,
        index: usize,
        tag: u64,
        enabled: bool,
    ) -> Result<(), NativeError>;

    fn remove_menu_item(&self, handle: NativeHandle, index: usize) -> Result<(), NativeError>;

    fn capabilities(&self) -> Capabilities {
        CAPABILITIES
    }
}
