#![allow(dead_code)]

use statusbar_tray::daemon::EventBus;
use statusbar_tray::menu::{EventRouter, MenuEvent, MenuListener};
use statusbar_tray::native::RecordingStatusBar;
use statusbar_tray::tray::dispatch::UiLoop;
use statusbar_tray::{TrayContext, TrayIcon};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

pub const TIMEOUT: Duration = Duration::from_secs(5);

pub struct Harness {
    pub ctx: TrayContext,
    pub bar: Arc<RecordingStatusBar>,
    pub ui_loop: UiLoop,
    pub events: EventBus,
}

impl Harness {
    pub fn icon(&self) -> TrayIcon {
        TrayIcon::new(&self.ctx)
    }

    pub fn router(&self) -> &Arc<EventRouter> {
        self.ctx.router()
    }
}

pub fn harness() -> Harness {
    let (ui_loop, ui) = UiLoop::new();
    let bar = Arc::new(RecordingStatusBar::new());
    let router = Arc::new(EventRouter::new(ui));
    let events = EventBus::new();
    let ctx = TrayContext::new(bar.clone(), router, events.clone());
    Harness {
        ctx,
        bar,
        ui_loop,
        events,
    }
}

pub fn wait_until(condition: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + TIMEOUT;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    condition()
}

/// Listener that records the events it receives.
pub fn recorder() -> (MenuListener, Arc<Mutex<Vec<MenuEvent>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let listener: MenuListener = Arc::new(move |event: &MenuEvent| {
        sink.lock().unwrap().push(event.clone());
    });
    (listener, seen)
}
