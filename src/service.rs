//! Process-wide registry of the icons shown in the status bar.

use crate::daemon::{EventBus, TrayEvent};
use crate::error::TrayError;
use crate::tray::{IconId, TrayIcon};
use once_cell::sync::OnceCell;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

static GLOBAL: OnceCell<TrayService> = OnceCell::new();

/// Icons currently added to the status bar, keyed by identity.
///
/// Membership changes happen under the registry lock; native work for the
/// affected icon happens after the lock is released.
#[derive(Default)]
pub struct TrayService {
    members: Mutex<HashMap<IconId, TrayIcon>>,
    disposed: AtomicBool,
    events: OnceCell<EventBus>,
}

impl TrayService {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide instance, created on first use.
    pub fn global() -> &'static TrayService {
        GLOBAL.get_or_init(|| {
            log::debug!("Initializing global tray service");
            TrayService::new()
        })
    }

    /// Publishes disposal summaries on `events`. Only the first bus sticks.
    pub fn publish_to(&self, events: EventBus) {
        if self.events.set(events).is_err() {
            log::debug!("Tray service already publishes events");
        }
    }

    fn members(&self) -> MutexGuard<'_, HashMap<IconId, TrayIcon>> {
        self.members.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds `icon` and creates its native peer. Returns `false` if it was
    /// already a member. An icon whose peer could not be created is not kept.
    pub fn add(&self, icon: &TrayIcon) -> Result<bool, TrayError> {
        {
            let mut members = self.members();
            if members.contains_key(&icon.id()) {
                log::debug!("Icon {} already in the status bar", icon.id());
                return Ok(false);
            }
            members.insert(icon.id(), icon.clone());
        }

        log::info!("Adding icon {} to the status bar", icon.id());
        if let Err(e) = icon.add_notify() {
            log::warn!("Icon {} not added: {}", icon.id(), e);
            self.members().remove(&icon.id());
            return Err(e);
        }
        Ok(true)
    }

    /// Releases the native peer of `icon` and drops it from the registry.
    /// Returns `false` if it was not a member.
    pub fn remove(&self, icon: &TrayIcon) -> Result<bool, TrayError> {
        let Some(member) = self.members().remove(&icon.id()) else {
            return Ok(false);
        };

        log::info!("Removing icon {} from the status bar", member.id());
        member.remove()?;
        Ok(true)
    }

    pub fn contains(&self, icon: &TrayIcon) -> bool {
        self.members().contains_key(&icon.id())
    }

    pub fn icons(&self) -> Vec<TrayIcon> {
        self.members().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.members().len()
    }

    pub fn is_empty(&self) -> bool {
        self.members().is_empty()
    }

    /// Disposes every member and clears the registry. Runs once; failures on
    /// one icon never stop the rest.
    pub fn dispose_all(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            log::debug!("Tray service already disposed");
            return;
        }

        let icons: Vec<TrayIcon> = self.members().drain().map(|(_, icon)| icon).collect();
        log::info!("Disposing {} tray icon(s)", icons.len());

        for icon in &icons {
            let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| icon.dispose()));
            if outcome.is_err() {
                log::error!("Icon {}: dispose panicked, continuing", icon.id());
            }
        }

        if let Some(events) = self.events.get() {
            events.send(TrayEvent::Disposed { icons: icons.len() });
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    /// Returns a guard that disposes this service when dropped.
    pub fn exit_guard(&self) -> ExitGuard<'_> {
        ExitGuard { service: self }
    }
}

/// Disposes its service on drop, covering early returns and unwinding out
/// of `main`.
pub struct ExitGuard<'a> {
    service: &'a TrayService,
}

impl Drop for ExitGuard<'_> {
    fn drop(&mut self) {
        self.service.dispose_all();
    }
}
