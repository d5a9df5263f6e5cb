use super::MenuTag;
use crate::native::MouseEventKind;
use crate::tray::dispatch::UiDispatcher;
use crate::tray::{IconId, TrayIcon, WeakTrayIcon};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

type Directory = Arc<RwLock<HashMap<IconId, WeakTrayIcon>>>;

/// Takes callbacks from the native event thread and replays them on the UI
/// thread against the icon they name.
///
/// Icons are resolved on the UI thread, so an icon dropped between delivery
/// and dispatch simply misses the event.
pub struct EventRouter {
    directory: Directory,
    ui: UiDispatcher,
}

impl EventRouter {
    pub fn new(ui: UiDispatcher) -> Self {
        Self {
            directory: Arc::new(RwLock::new(HashMap::new())),
            ui,
        }
    }

    pub fn dispatcher(&self) -> &UiDispatcher {
        &self.ui
    }

    pub(crate) fn register(&self, icon: IconId, target: WeakTrayIcon) {
        self.directory
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(icon, target);
    }

    pub(crate) fn unregister(&self, icon: IconId) {
        self.directory
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&icon);
    }

    pub fn is_registered(&self, icon: IconId) -> bool {
        self.directory
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&icon)
    }

    /// The status item itself was activated.
    pub fn on_status_item_selected(&self, icon: IconId) -> bool {
        self.post_to(icon, "status item selection", |target| {
            let notified = target.fire_action();
            log::debug!("Icon {} activated, {} listener(s) notified", target.id(), notified);
        })
    }

    pub fn on_menu_item_selected(&self, icon: IconId, tag: u64) -> bool {
        self.post_to(icon, "menu selection", move |target| {
            target.item_selected_callback(MenuTag::new(tag));
        })
    }

    pub fn on_mouse_event(&self, icon: IconId, kind: MouseEventKind, x: f64, y: f64, item_x: f64) -> bool {
        self.post_to(icon, "mouse event", move |target| {
            let outcome = target.handle_mouse_event(kind, x, y, item_x);
            log::debug!("Icon {}: {:?} -> {:?}", target.id(), kind, outcome);
        })
    }

    fn post_to<F>(&self, icon: IconId, what: &'static str, deliver: F) -> bool
    where
        F: FnOnce(&TrayIcon) + Send + 'static,
    {
        if !self.is_registered(icon) {
            log::debug!("Dropping {} for unknown icon {}", what, icon);
            return false;
        }

        let directory = self.directory.clone();
        self.ui.post(move || {
            let target = directory
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .get(&icon)
                .and_then(WeakTrayIcon::upgrade);
            match target {
                Some(target) => deliver(&target),
                None => log::debug!("Icon {} went away before its {} ran", icon, what),
            }
        });
        true
    }
}
