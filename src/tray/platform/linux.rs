use super::driver::Driver;
use super::{Job, PUMP_INTERVAL};
use crate::menu::EventRouter;
use anyhow::Result;
use gtk::glib;
use std::sync::mpsc::{Receiver, Sender};
use std::sync::Arc;

/// Runs the driver inside a GTK main loop on its own thread.
pub fn spawn(router: Arc<EventRouter>, jobs: Receiver<Job>, ready: Sender<Result<(), String>>) -> Result<()> {
    std::thread::Builder::new()
        .name("tray-native".into())
        .spawn(move || {
            if gtk::init().is_err() {
                log::error!("Failed to initialize GTK");
                let _ = ready.send(Err("failed to initialize GTK".into()));
                return;
            }

            let mut driver = Driver::new(router);
            let _ = ready.send(Ok(()));

            glib::timeout_add_local(PUMP_INTERVAL, move || {
                driver.run_pending(&jobs);
                driver.pump_events();
                if driver.is_running() {
                    glib::ControlFlow::Continue
                } else {
                    log::debug!("Native status bar thread stopping");
                    gtk::main_quit();
                    glib::ControlFlow::Break
                }
            });
            gtk::main();
        })?;
    Ok(())
}
