use super::driver::Driver;
use super::{Job, PUMP_INTERVAL};
use crate::menu::EventRouter;
use anyhow::Result;
use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;

/// Runs the driver on its own thread, waking for jobs or every pump interval.
pub fn spawn(router: Arc<EventRouter>, jobs: Receiver<Job>, ready: Sender<Result<(), String>>) -> Result<()> {
    std::thread::Builder::new()
        .name("tray-native".into())
        .spawn(move || {
            let mut driver = Driver::new(router);
            let _ = ready.send(Ok(()));

            while driver.is_running() {
                match jobs.recv_timeout(PUMP_INTERVAL) {
                    Ok(job) => job(&mut driver),
                    Err(RecvTimeoutError::Timeout) => {}
                    Err(RecvTimeoutError::Disconnected) => break,
                }
                driver.run_pending(&jobs);
                driver.pump_events();
            }
            log::debug!("Native status bar thread stopping");
        })?;
    Ok(())
}
