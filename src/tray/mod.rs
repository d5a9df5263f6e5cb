//! Status bar icons and their native peers.
//!
//! A [`TrayIcon`] keeps its caption, tooltip, image and menu locally at all
//! times and mirrors them onto a native status item while one exists. The
//! native item is created by [`TrayIcon::add_notify`] and released by
//! [`TrayIcon::remove`]. The phase changes on the calling thread; the
//! native call itself moves off the UI thread when requested on it.

pub mod dispatch;
pub mod icon;
pub mod platform;

use crate::daemon::{EventBus, TrayEvent};
use crate::error::{NativeError, TrayError};
use crate::menu::{EventRouter, MenuListener, MenuRegistry, MenuTag};
use crate::native::{MouseEventKind, NativeHandle, ScreenFrame, StatusBar};
use dispatch::{off_ui_thread, UiDispatcher};
use icon::{IconOptions, NativeImage, Rasterize};
use serde::Serialize;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError, Weak};
use std::time::{Duration, Instant};

/// Command string carried by [`ActionEvent`]s fired from a click.
pub const PRESS_ACTION: &str = "PressAction";

static NEXT_ICON_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a [`TrayIcon`], also used by the native layer
/// to address callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct IconId(u64);

impl IconId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }

    fn next() -> Self {
        Self(NEXT_ICON_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for IconId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Detached,
    Attaching,
    Attached,
    Detaching,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionEvent {
    pub icon: IconId,
    pub command: &'static str,
}

pub type ActionListener = Arc<dyn Fn(&ActionEvent) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// What a mouse press on the status item resulted in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MouseOutcome {
    Ignored,
    MenuClosed,
    Activated,
    MenuOpened { anchor_x: f64 },
}

/// Collaborators shared by every icon of one tray.
#[derive(Clone)]
pub struct TrayContext {
    status_bar: Arc<dyn StatusBar>,
    router: Arc<EventRouter>,
    ui: UiDispatcher,
    events: EventBus,
}

impl TrayContext {
    pub fn new(status_bar: Arc<dyn StatusBar>, router: Arc<EventRouter>, events: EventBus) -> Self {
        let ui = router.dispatcher().clone();
        Self {
            status_bar,
            router,
            ui,
            events,
        }
    }

    pub fn status_bar(&self) -> &Arc<dyn StatusBar> {
        &self.status_bar
    }

    pub fn router(&self) -> &Arc<EventRouter> {
        &self.router
    }

    pub fn ui(&self) -> &UiDispatcher {
        &self.ui
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }
}

struct IconState {
    phase: Phase,
    handle: NativeHandle,
    caption: String,
    tooltip: String,
    image: Option<NativeImage>,
    auto_size: bool,
    highlighted: bool,
    menu_showing: bool,
    menu: MenuRegistry,
    action_listeners: Vec<(ListenerId, ActionListener)>,
    next_listener: u64,
}

impl Default for IconState {
    fn default() -> Self {
        Self {
            phase: Phase::Detached,
            handle: NativeHandle::INVALID,
            caption: String::new(),
            tooltip: String::new(),
            image: None,
            auto_size: false,
            highlighted: false,
            menu_showing: false,
            menu: MenuRegistry::new(),
            action_listeners: Vec::new(),
            next_listener: 0,
        }
    }
}

struct IconShared {
    id: IconId,
    ctx: TrayContext,
    state: Mutex<IconState>,
    settled: Condvar,
}

impl IconShared {
    fn lock(&self) -> MutexGuard<'_, IconState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn wait<'a>(&self, guard: MutexGuard<'a, IconState>) -> MutexGuard<'a, IconState> {
        self.settled.wait(guard).unwrap_or_else(PoisonError::into_inner)
    }

    /// Issues a state push against the peer, if there is one.
    fn push<F>(&self, state: &IconState, call: &'static str, f: F) -> Result<(), TrayError>
    where
        F: FnOnce(&dyn StatusBar, NativeHandle) -> Result<(), NativeError>,
    {
        if state.phase != Phase::Attached {
            return Ok(());
        }
        f(self.ctx.status_bar.as_ref(), state.handle).map_err(|e| {
            log::error!("Icon {}: {} failed: {}", self.id, call, e);
            TrayError::native(call, e)
        })
    }

    /// Applies the full local state to a freshly created peer.
    fn push_all(&self, state: &IconState) -> Result<(), TrayError> {
        let mut results = vec![
            self.push(state, "set_title", |bar, h| bar.set_title(h, &state.caption)),
            self.push(state, "set_tooltip", |bar, h| bar.set_tooltip(h, &state.tooltip)),
        ];
        if let Some(image) = &state.image {
            results.push(self.push(state, "set_image", |bar, h| bar.set_image(h, image)));
        }
        if state.highlighted {
            results.push(self.push(state, "set_highlighted", |bar, h| bar.set_highlighted(h, true)));
        }
        for (index, entry) in state.menu.entries().iter().enumerate() {
            results.push(self.push(state, "add_menu_item", |bar, h| {
                bar.add_menu_item(h, &entry.label, index, entry.tag.raw(), entry.enabled)
            }));
        }
        results.into_iter().collect()
    }

    /// Claims the `Detached -> Attaching` transition, waiting out an
    /// in-flight remove. Returns `false` if a peer exists or is being created.
    fn begin_attach(&self) -> bool {
        let mut state = self.lock();
        loop {
            match state.phase {
                Phase::Detached => break,
                Phase::Detaching => state = self.wait(state),
                Phase::Attaching | Phase::Attached => {
                    log::debug!("Icon {} already has a native peer", self.id);
                    return false;
                }
            }
        }
        state.phase = Phase::Attaching;
        true
    }

    /// Creates the peer for a claimed attach and applies the local state.
    fn finish_attach(&self) -> Result<(), TrayError> {
        let created = self.ctx.status_bar.create(self.id);

        let mut state = self.lock();
        let result = match created {
            Ok(handle) => {
                state.handle = handle;
                state.phase = Phase::Attached;
                log::info!("Icon {} attached as {:?}", self.id, handle);
                let pushed = self.push_all(&state);
                self.ctx.events.send(TrayEvent::Attached { icon: self.id });
                pushed
            }
            Err(e) => {
                state.handle = NativeHandle::INVALID;
                state.phase = Phase::Detached;
                log::error!("Icon {}: creating native status item failed: {}", self.id, e);
                self.ctx.events.send(TrayEvent::AttachFailed {
                    icon: self.id,
                    reason: e.to_string(),
                });
                Err(TrayError::native("create", e))
            }
        };
        drop(state);
        self.settled.notify_all();
        result
    }

    /// Claims the `Attached -> Detaching` transition, waiting out an
    /// in-flight create. Returns the handle to destroy, if there is a peer.
    fn begin_detach(&self) -> Option<NativeHandle> {
        let mut state = self.lock();
        while state.phase == Phase::Attaching {
            state = self.wait(state);
        }
        if state.phase != Phase::Attached {
            return None;
        }
        state.phase = Phase::Detaching;
        state.menu_showing = false;
        Some(std::mem::replace(&mut state.handle, NativeHandle::INVALID))
    }

    fn finish_detach(&self, handle: NativeHandle) -> Result<(), TrayError> {
        let destroyed = self.ctx.status_bar.destroy(handle);

        self.lock().phase = Phase::Detached;
        self.settled.notify_all();
        log::info!("Icon {} detached", self.id);
        self.ctx.events.send(TrayEvent::Detached { icon: self.id });

        destroyed.map_err(|e| {
            log::error!("Icon {}: destroying native status item failed: {}", self.id, e);
            TrayError::native("destroy", e)
        })
    }

    /// Puts a claimed transition back when its worker never started.
    fn abandon(&self, claimed: Phase, phase: Phase, handle: NativeHandle) {
        let mut state = self.lock();
        if state.phase == claimed {
            state.phase = phase;
            state.handle = handle;
        }
        drop(state);
        self.settled.notify_all();
    }
}

impl Drop for IconShared {
    fn drop(&mut self) {
        self.ctx.router.unregister(self.id);

        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        if state.phase != Phase::Attached || !state.handle.is_valid() {
            return;
        }
        let handle = std::mem::replace(&mut state.handle, NativeHandle::INVALID);
        state.phase = Phase::Detached;

        let id = self.id;
        let bar = self.ctx.status_bar.clone();
        let release = move || {
            if let Err(e) = bar.destroy(handle) {
                log::warn!("Icon {}: releasing native status item failed: {}", id, e);
            }
        };

        log::debug!("Icon {} dropped while attached, releasing peer", id);
        if self.ctx.ui.is_ui_thread() {
            let spawned = std::thread::Builder::new()
                .name("tray-release".into())
                .spawn(release);
            if let Err(e) = spawned {
                log::error!("Icon {}: could not spawn release worker, leaking peer: {}", id, e);
            }
        } else {
            release();
        }
    }
}

/// Weak reference held by the [`EventRouter`] directory.
#[derive(Clone)]
pub(crate) struct WeakTrayIcon(Weak<IconShared>);

impl WeakTrayIcon {
    pub(crate) fn upgrade(&self) -> Option<TrayIcon> {
        self.0.upgrade().map(|shared| TrayIcon { shared })
    }
}

/// A status bar icon. Clones share one identity and one native peer.
#[derive(Clone)]
pub struct TrayIcon {
    shared: Arc<IconShared>,
}

impl TrayIcon {
    pub fn new(ctx: &TrayContext) -> Self {
        let shared = Arc::new(IconShared {
            id: IconId::next(),
            ctx: ctx.clone(),
            state: Mutex::new(IconState::default()),
            settled: Condvar::new(),
        });
        ctx.router
            .register(shared.id, WeakTrayIcon(Arc::downgrade(&shared)));
        Self { shared }
    }

    fn lock(&self) -> MutexGuard<'_, IconState> {
        self.shared.lock()
    }

    pub fn id(&self) -> IconId {
        self.shared.id
    }

    pub fn phase(&self) -> Phase {
        self.lock().phase
    }

    pub fn peer_exists(&self) -> bool {
        self.phase() == Phase::Attached
    }

    /// Creates the native peer unless one exists or is being created.
    ///
    /// When the native create is handed to a worker, the icon is already
    /// `Attaching` on return.
    pub fn add_notify(&self) -> Result<(), TrayError> {
        if !self.shared.begin_attach() {
            return Ok(());
        }
        let shared = self.shared.clone();
        let deferred = off_ui_thread(&self.shared.ctx.ui, "create", move || shared.finish_attach());
        if let Err(TrayError::Spawn(_)) = &deferred {
            self.shared
                .abandon(Phase::Attaching, Phase::Detached, NativeHandle::INVALID);
        }
        deferred
    }

    /// Releases the native peer, waiting for an in-flight create first.
    pub fn remove(&self) -> Result<(), TrayError> {
        let Some(handle) = self.shared.begin_detach() else {
            return Ok(());
        };
        let shared = self.shared.clone();
        let deferred = off_ui_thread(&self.shared.ctx.ui, "remove", move || shared.finish_detach(handle));
        if let Err(TrayError::Spawn(_)) = &deferred {
            self.shared.abandon(Phase::Detaching, Phase::Attached, handle);
        }
        deferred
    }

    /// Like [`remove`](Self::remove), but only logs failures.
    pub fn dispose(&self) {
        if let Err(e) = self.remove() {
            log::warn!("Icon {}: dispose failed: {}", self.id(), e);
        }
    }

    /// Waits until no create or remove is in flight.
    pub fn wait_settled(&self, timeout: Duration) -> bool {
        let deadline = Instant::now().checked_add(timeout);
        let mut state = self.lock();
        while matches!(state.phase, Phase::Attaching | Phase::Detaching) {
            let Some(deadline) = deadline else {
                state = self.shared.wait(state);
                continue;
            };
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return false;
            }
            state = self
                .shared
                .settled
                .wait_timeout(state, remaining)
                .map(|(guard, _)| guard)
                .unwrap_or_else(|e| e.into_inner().0);
        }
        true
    }

    pub fn caption(&self) -> String {
        self.lock().caption.clone()
    }

    pub fn set_caption(&self, caption: impl Into<String>) -> Result<(), TrayError> {
        let mut state = self.lock();
        state.caption = caption.into();
        self.shared
            .push(&state, "set_title", |bar, h| bar.set_title(h, &state.caption))
    }

    pub fn tooltip(&self) -> String {
        self.lock().tooltip.clone()
    }

    pub fn set_tooltip(&self, tooltip: impl Into<String>) -> Result<(), TrayError> {
        let mut state = self.lock();
        state.tooltip = tooltip.into();
        self.shared
            .push(&state, "set_tooltip", |bar, h| bar.set_tooltip(h, &state.tooltip))
    }

    /// Converts and stores a new image. On conversion failure the previous
    /// image stays, locally and on the peer.
    pub fn set_icon(&self, source: &dyn Rasterize, is_template: bool) -> Result<(), TrayError> {
        if is_template && !self.shared.ctx.status_bar.capabilities().template_images {
            log::debug!("Icon {}: template image will render as a plain image", self.id());
        }
        let auto_size = self.lock().auto_size;
        let image = icon::convert(source, IconOptions { is_template, auto_size }).map_err(|e| {
            log::warn!("Icon {}: image conversion failed: {}", self.id(), e);
            e
        })?;

        let mut state = self.lock();
        state.image = Some(image);
        self.shared.push(&state, "set_image", |bar, h| match &state.image {
            Some(image) => bar.set_image(h, image),
            None => Ok(()),
        })
    }

    pub fn has_image(&self) -> bool {
        self.lock().image.is_some()
    }

    pub fn is_template(&self) -> bool {
        self.lock().image.as_ref().is_some_and(|i| i.is_template)
    }

    /// Scale images set from now on to the status bar height.
    pub fn set_icon_auto_size(&self, auto_size: bool) {
        self.lock().auto_size = auto_size;
    }

    pub fn highlighted(&self) -> bool {
        self.lock().highlighted
    }

    pub fn set_highlighted(&self, highlighted: bool) -> Result<(), TrayError> {
        let mut state = self.lock();
        state.highlighted = highlighted;
        self.shared.push(&state, "set_highlighted", |bar, h| {
            bar.set_highlighted(h, highlighted)
        })
    }

    /// Screen rectangle of the status item, or `None` without a peer.
    pub fn screen_frame(&self) -> Result<Option<ScreenFrame>, TrayError> {
        let state = self.lock();
        if state.phase != Phase::Attached {
            return Ok(None);
        }
        self.shared
            .ctx
            .status_bar
            .screen_frame(state.handle)
            .map(Some)
            .map_err(|e| TrayError::native("screen_frame", e))
    }

    pub fn show_balloon_message(&self, caption: &str, _text: &str) -> Result<(), TrayError> {
        log::debug!("Icon {}: balloon message {:?} refused", self.id(), caption);
        Err(TrayError::Unsupported("balloon messages"))
    }

    pub fn add_item(
        &self,
        label: &str,
        index: usize,
        listener: Option<MenuListener>,
    ) -> Result<MenuTag, TrayError> {
        let mut state = self.lock();
        let tag = state.menu.insert(label, index, listener)?;
        let enabled = state.menu.entries()[index].enabled;
        self.shared.push(&state, "add_menu_item", |bar, h| {
            bar.add_menu_item(h, label, index, tag.raw(), enabled)
        })?;
        Ok(tag)
    }

    pub fn add_separator(&self, index: usize) -> Result<MenuTag, TrayError> {
        self.add_item(crate::menu::SEPARATOR, index, None)
    }

    pub fn remove_item(&self, index: usize) -> Result<(), TrayError> {
        let mut state = self.lock();
        state.menu.remove(index)?;
        self.shared
            .push(&state, "remove_menu_item", |bar, h| bar.remove_menu_item(h, index))
    }

    pub fn menu_labels(&self) -> Vec<String> {
        self.lock()
            .menu
            .labels()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    pub fn menu_tags(&self) -> Vec<MenuTag> {
        self.lock().menu.tags()
    }

    pub fn menu_len(&self) -> usize {
        self.lock().menu.len()
    }

    /// Delivers a menu selection to its listener. Tags that no longer
    /// resolve are dropped. Returns whether a listener ran.
    pub fn item_selected_callback(&self, tag: MenuTag) -> bool {
        self.menu_closed();

        let resolved = self.lock().menu.resolve(self.id(), tag);
        let Some((listener, event)) = resolved else {
            log::debug!("Icon {}: dropping selection of stale menu tag {}", self.id(), tag);
            return false;
        };

        self.shared.ctx.events.send(TrayEvent::MenuItemSelected {
            icon: self.id(),
            tag,
        });
        listener(&event);
        true
    }

    pub fn add_action_listener<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&ActionEvent) + Send + Sync + 'static,
    {
        let mut state = self.lock();
        let id = ListenerId(state.next_listener);
        state.next_listener += 1;
        state.action_listeners.push((id, Arc::new(listener)));
        id
    }

    pub fn remove_action_listener(&self, id: ListenerId) -> bool {
        let mut state = self.lock();
        let before = state.action_listeners.len();
        state.action_listeners.retain(|(existing, _)| *existing != id);
        state.action_listeners.len() != before
    }

    /// Notifies every action listener. Returns how many ran.
    pub fn fire_action(&self) -> usize {
        let listeners: Vec<ActionListener> = self
            .lock()
            .action_listeners
            .iter()
            .map(|(_, l)| l.clone())
            .collect();

        let event = ActionEvent {
            icon: self.id(),
            command: PRESS_ACTION,
        };
        self.shared
            .ctx
            .events
            .send(TrayEvent::Activated { icon: self.id() });
        for listener in &listeners {
            listener(&event);
        }
        listeners.len()
    }

    /// Reacts to a press on the status item: closes an open menu, fires
    /// action listeners on a plain click, or opens the menu.
    pub fn handle_mouse_event(&self, kind: MouseEventKind, _x: f64, _y: f64, item_x: f64) -> MouseOutcome {
        if !kind.is_press() {
            return MouseOutcome::Ignored;
        }

        let (showing, has_listeners, has_menu) = {
            let state = self.lock();
            (
                state.menu_showing,
                !state.action_listeners.is_empty(),
                !state.menu.is_empty(),
            )
        };

        if showing {
            self.menu_closed();
            return MouseOutcome::MenuClosed;
        }
        if kind == MouseEventKind::LeftDown && has_listeners {
            self.fire_action();
            return MouseOutcome::Activated;
        }
        if has_menu {
            self.lock().menu_showing = true;
            if let Err(e) = self.set_highlighted(true) {
                log::warn!("Icon {}: could not highlight status item: {}", self.id(), e);
            }
            return MouseOutcome::MenuOpened { anchor_x: item_x };
        }
        MouseOutcome::Ignored
    }

    pub fn menu_showing(&self) -> bool {
        self.lock().menu_showing
    }

    /// Marks the menu closed and clears the highlight.
    pub fn menu_closed(&self) {
        let was_highlighted = {
            let mut state = self.lock();
            state.menu_showing = false;
            state.highlighted
        };
        if was_highlighted {
            if let Err(e) = self.set_highlighted(false) {
                log::warn!("Icon {}: could not clear highlight: {}", self.id(), e);
            }
        }
    }
}

impl PartialEq for TrayIcon {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }
}

impl Eq for TrayIcon {}

impl Hash for TrayIcon {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

impl fmt::Debug for TrayIcon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrayIcon")
            .field("id", &self.id())
            .field("phase", &self.phase())
            .finish()
    }
}
