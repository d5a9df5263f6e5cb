use super::Job;
use crate::error::NativeError;
use crate::menu::{EventRouter, SEPARATOR};
use crate::native::{MouseEventKind, NativeHandle, ScreenFrame};
use crate::tray::icon::NativeImage;
use crate::tray::IconId;
use std::collections::HashMap;
use std::sync::mpsc::{Receiver, TryRecvError};
use std::sync::Arc;
use tray_icon::menu::{Menu, MenuEvent, MenuId, MenuItem, PredefinedMenuItem};
use tray_icon::{Icon, MouseButton, MouseButtonState, TrayIcon, TrayIconBuilder, TrayIconEvent, TrayIconId};

struct StatusItem {
    icon: IconId,
    tray: TrayIcon,
    menu: Menu,
}

/// Owns the `tray-icon` objects. Lives on the native thread only.
pub struct Driver {
    items: HashMap<NativeHandle, StatusItem>,
    next_handle: u64,
    router: Arc<EventRouter>,
    running: bool,
}

fn backend(e: impl std::fmt::Display) -> NativeError {
    NativeError::Backend(e.to_string())
}

impl Driver {
    pub fn new(router: Arc<EventRouter>) -> Self {
        Self {
            items: HashMap::new(),
            next_handle: 0,
            router,
            running: true,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn run_pending(&mut self, jobs: &Receiver<Job>) {
        loop {
            match jobs.try_recv() {
                Ok(job) => job(self),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.running = false;
                    break;
                }
            }
        }
    }

    fn item(&self, handle: NativeHandle) -> Result<&StatusItem, NativeError> {
        self.items.get(&handle).ok_or(NativeError::InvalidHandle(handle))
    }

    pub fn create(&mut self, icon: IconId) -> Result<NativeHandle, NativeError> {
        let menu = Menu::new();
        let tray = TrayIconBuilder::new()
            .with_id(TrayIconId::new(icon.to_string()))
            .with_menu(Box::new(menu.clone()))
            .build()
            .map_err(backend)?;

        self.next_handle += 1;
        let handle = NativeHandle::new(self.next_handle);
        self.items.insert(handle, StatusItem { icon, tray, menu });
        log::debug!("Created status item {:?} for icon {}", handle, icon);
        Ok(handle)
    }

    pub fn destroy(&mut self, handle: NativeHandle) -> Result<(), NativeError> {
        let item = self
            .items
            .remove(&handle)
            .ok_or(NativeError::InvalidHandle(handle))?;
        log::debug!("Destroyed status item {:?} of icon {}", handle, item.icon);
        Ok(())
    }

    pub fn set_title(&self, handle: NativeHandle, title: &str) -> Result<(), NativeError> {
        self.item(handle)?.tray.set_title(Some(title));
        Ok(())
    }

    pub fn set_tooltip(&self, handle: NativeHandle, tooltip: &str) -> Result<(), NativeError> {
        self.item(handle)?
            .tray
            .set_tooltip(Some(tooltip))
            .map_err(backend)
    }

    pub fn set_image(&self, handle: NativeHandle, image: NativeImage) -> Result<(), NativeError> {
        let item = self.item(handle)?;
        let is_template = image.is_template;
        let icon = Icon::from_rgba(image.data, image.width, image.height).map_err(backend)?;
        item.tray.set_icon(Some(icon)).map_err(backend)?;

        #[cfg(target_os = "macos")]
        item.tray.set_icon_as_template(is_template);
        #[cfg(not(target_os = "macos"))]
        let _ = is_template;
        Ok(())
    }

    /// The menu is drawn by the platform here, which highlights the item
    /// on its own.
    pub fn set_highlighted(&self, handle: NativeHandle, highlighted: bool) -> Result<(), NativeError> {
        self.item(handle)?;
        log::trace!("Status item {:?} highlighted: {}", handle, highlighted);
        Ok(())
    }

    pub fn screen_frame(&self, handle: NativeHandle) -> Result<ScreenFrame, NativeError> {
        let rect = self
            .item(handle)?
            .tray
            .rect()
            .ok_or_else(|| NativeError::Backend("status item has no on-screen frame".into()))?;
        Ok(ScreenFrame {
            x: rect.position.x,
            y: rect.position.y,
            width: rect.size.width as f64,
            height: rect.size.height as f64,
        })
    }

    pub fn add_menu_item(
        &self,
        handle: NativeHandle,
        label: &str,
        index: usize,
        tag: u64,
        enabled: bool,
    ) -> Result<(), NativeError> {
        let item = self.item(handle)?;
        let count = item.menu.items().len();
        if index > count {
            return Err(NativeError::MenuIndex { index, count });
        }

        if label == SEPARATOR {
            item.menu
                .insert(&PredefinedMenuItem::separator(), index)
                .map_err(backend)
        } else {
            let entry = MenuItem::with_id(menu_id(item.icon, tag), label, enabled, None);
            item.menu.insert(&entry, index).map_err(backend)
        }
    }

    pub fn remove_menu_item(&self, handle: NativeHandle, index: usize) -> Result<(), NativeError> {
        let item = self.item(handle)?;
        let count = item.menu.items().len();
        item.menu
            .remove_at(index)
            .map(|_| ())
            .ok_or(NativeError::MenuIndex { index, count })
    }

    /// Forwards whatever the platform delivered since the last pump.
    pub fn pump_events(&self) {
        while let Ok(event) = MenuEvent::receiver().try_recv() {
            log::debug!("Menu event: {}", event.id.0);
            match parse_menu_id(&event.id.0) {
                Some((icon, tag)) => {
                    self.router.on_menu_item_selected(icon, tag);
                }
                None => log::warn!("Unrecognized menu event id: {}", event.id.0),
            }
        }

        while let Ok(event) = TrayIconEvent::receiver().try_recv() {
            self.route_tray_event(event);
        }
    }

    fn route_tray_event(&self, event: TrayIconEvent) {
        match event {
            TrayIconEvent::Click {
                id,
                position,
                rect,
                button,
                button_state,
                ..
            } => {
                let Some(icon) = parse_icon_id(&id.0) else {
                    return;
                };
                let kind = mouse_kind(button, button_state);
                self.router
                    .on_mouse_event(icon, kind, position.x, position.y, rect.position.x);
            }
            TrayIconEvent::DoubleClick { id, .. } => {
                if let Some(icon) = parse_icon_id(&id.0) {
                    self.router.on_status_item_selected(icon);
                }
            }
            _ => {}
        }
    }
}

fn menu_id(icon: IconId, tag: u64) -> MenuId {
    MenuId::new(format!("{}::{}", icon, tag))
}

fn parse_icon_id(raw: &str) -> Option<IconId> {
    raw.parse().ok().map(IconId::new)
}

fn parse_menu_id(raw: &str) -> Option<(IconId, u64)> {
    let (icon, tag) = raw.split_once("::")?;
    Some((parse_icon_id(icon)?, tag.parse().ok()?))
}

fn mouse_kind(button: MouseButton, state: MouseButtonState) -> MouseEventKind {
    match (button, state) {
        (MouseButton::Left, MouseButtonState::Down) => MouseEventKind::LeftDown,
        (MouseButton::Left, MouseButtonState::Up) => MouseEventKind::LeftUp,
        (MouseButton::Right, MouseButtonState::Down) => MouseEventKind::RightDown,
        (MouseButton::Right, MouseButtonState::Up) => MouseEventKind::RightUp,
        _ => MouseEventKind::Other,
    }
}
