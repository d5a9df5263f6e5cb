use anyhow::Result;
use statusbar_tray::config::TrayConfig;
use statusbar_tray::daemon::{EventBus, TrayEvent};
use statusbar_tray::menu::{EventRouter, MenuEvent, MenuListener};
use statusbar_tray::native::{RecordingStatusBar, StatusBar};
use statusbar_tray::tray::dispatch::UiLoop;
use statusbar_tray::tray::platform::PlatformStatusBar;
use statusbar_tray::{TrayContext, TrayIcon, TrayService};
use std::sync::Arc;
use tokio::sync::broadcast;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .init();

    log::info!("Starting status bar tray...");

    let config = TrayConfig::load()?;
    let (shutdown_tx, mut shutdown_rx) = broadcast::channel::<()>(1);

    let (ui_loop, ui) = UiLoop::new();
    let ui_thread = std::thread::Builder::new()
        .name("tray-ui".into())
        .spawn(move || ui_loop.run())?;

    let router = Arc::new(EventRouter::new(ui.clone()));
    let status_bar: Arc<dyn StatusBar> = if config.headless {
        log::info!("Running headless");
        Arc::new(RecordingStatusBar::new())
    } else {
        Arc::new(PlatformStatusBar::spawn(router.clone())?)
    };

    log::debug!("Status bar capabilities: {:?}", status_bar.capabilities());

    let events = EventBus::with_buffer(config.event_buffer);
    spawn_event_logger(events.subscribe());

    let service = TrayService::global();
    service.publish_to(events.clone());
    let _exit_guard = service.exit_guard();

    let ctx = TrayContext::new(status_bar, router, events);
    let icon = TrayIcon::new(&ctx);

    let quit_tx = shutdown_tx.clone();
    let quit: MenuListener = Arc::new(move |_: &MenuEvent| {
        log::info!("Quit requested");
        let _ = quit_tx.send(());
    });
    config.apply_to(&icon, quit)?;
    service.add(&icon)?;

    log::info!("Status bar tray started");

    tokio::select! {
        _ = shutdown_rx.recv() => log::info!("Shutdown signal received, exiting..."),
        _ = tokio::signal::ctrl_c() => log::info!("Interrupted, exiting..."),
    }

    service.dispose_all();
    ui.post_quit();
    if ui_thread.join().is_err() {
        log::error!("UI thread panicked");
    }
    Ok(())
}

fn spawn_event_logger(mut rx: broadcast::Receiver<TrayEvent>) {
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => match serde_json::to_string(&event) {
                    Ok(json) => log::debug!("Tray event: {}", json),
                    Err(e) => log::warn!("Failed to serialize tray event: {}", e),
                },
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    log::warn!("Event logger missed {} tray events", missed);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });
}
