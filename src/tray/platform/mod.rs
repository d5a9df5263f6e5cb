//! [`StatusBar`] backed by the `tray-icon` crate.
//!
//! `tray-icon` objects are bound to the thread that created them, so every
//! native call is shipped to one dedicated thread and the caller blocks on
//! the reply. That thread also collects menu and click events and forwards
//! them to the [`EventRouter`].

mod driver;
#[cfg(target_os = "linux")]
mod linux;
#[cfg(not(target_os = "linux"))]
mod polling;

use crate::error::NativeError;
use crate::menu::EventRouter;
use crate::native::{NativeHandle, ScreenFrame, StatusBar};
use crate::tray::icon::NativeImage;
use crate::tray::IconId;
use anyhow::{Context, Result};
use driver::Driver;
use std::sync::mpsc::{self, Sender};
use std::sync::Arc;
use std::time::Duration;

const PUMP_INTERVAL: Duration = Duration::from_millis(50);

type Job = Box<dyn FnOnce(&mut Driver) + Send>;

pub struct PlatformStatusBar {
    jobs: Sender<Job>,
}

impl PlatformStatusBar {
    /// Starts the native thread and waits until it is ready for calls.
    pub fn spawn(router: Arc<EventRouter>) -> Result<Self> {
        let (jobs, job_rx) = mpsc::channel::<Job>();
        let (ready_tx, ready_rx) = mpsc::channel::<Result<(), String>>();

        #[cfg(target_os = "linux")]
        linux::spawn(router, job_rx, ready_tx)?;
        #[cfg(not(target_os = "linux"))]
        polling::spawn(router, job_rx, ready_tx)?;

        ready_rx
            .recv()
            .context("Native status bar thread exited during startup")?
            .map_err(|e| anyhow::anyhow!(e))?;

        log::info!("Native status bar ready");
        Ok(Self { jobs })
    }

    fn call<R, F>(&self, f: F) -> Result<R, NativeError>
    where
        R: Send + 'static,
        F: FnOnce(&mut Driver) -> Result<R, NativeError> + Send + 'static,
    {
        let (reply_tx, reply_rx) = mpsc::channel();
        let job: Job = Box::new(move |driver| {
            let _ = reply_tx.send(f(driver));
        });
        self.jobs.send(job).map_err(|_| NativeError::Unavailable)?;
        reply_rx.recv().map_err(|_| NativeError::Unavailable)?
    }
}

impl StatusBar for PlatformStatusBar {
    fn create(&self, icon: IconId) -> Result<NativeHandle, NativeError> {
        self.call(move |d| d.create(icon))
    }

    fn destroy(&self, handle: NativeHandle) -> Result<(), NativeError> {
        self.call(move |d| d.destroy(handle))
    }

    fn set_title(&self, handle: NativeHandle, title: &str) -> Result<(), NativeError> {
        let title = title.to_string();
        self.call(move |d| d.set_title(handle, &title))
    }

    fn set_tooltip(&self, handle: NativeHandle, tooltip: &str) -> Result<(), NativeError> {
        let tooltip = tooltip.to_string();
        self.call(move |d| d.set_tooltip(handle, &tooltip))
    }

    fn set_image(&self, handle: NativeHandle, image: &NativeImage) -> Result<(), NativeError> {
        let image = image.clone();
        self.call(move |d| d.set_image(handle, image))
    }

    fn set_highlighted(&self, handle: NativeHandle, highlighted: bool) -> Result<(), NativeError> {
        self.call(move |d| d.set_highlighted(handle, highlighted))
    }

    fn screen_frame(&self, handle: NativeHandle) -> Result<ScreenFrame, NativeError> {
        self.call(move |d| d.screen_frame(handle))
    }

    fn add_menu_item(
        &self,
        handle: NativeHandle,
        label: &str,
        index: usize,
        tag: u64,
        enabled: bool,
    ) -> Result<(), NativeError> {
        let label = label.to_string();
        self.call(move |d| d.add_menu_item(handle, &label, index, tag, enabled))
    }

    fn remove_menu_item(&self, handle: NativeHandle, index: usize) -> Result<(), NativeError> {
        self.call(move |d| d.remove_menu_item(handle, index))
    }
}
