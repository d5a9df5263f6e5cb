//! UI-thread task queue and the rule for which thread talks to the status bar.
//!
//! One thread owns the [`UiLoop`] and runs application callbacks. Other
//! threads hand it work through a [`UiDispatcher`]. Native create/destroy
//! calls requested on the UI thread run on a short-lived worker instead, since
//! the status bar may itself wait on the UI thread while delivering events.

use crate::error::TrayError;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerResult {
    Continue,
    Quit,
}

type UiTask = Box<dyn FnOnce() -> HandlerResult + Send>;
type Owner = Arc<Mutex<Option<ThreadId>>>;

#[derive(Clone)]
pub struct UiDispatcher {
    tx: Sender<UiTask>,
    owner: Owner,
}

impl UiDispatcher {
    /// Queues `task` for the UI thread. Dropped if the loop is gone.
    pub fn post<F>(&self, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.post_task(Box::new(move || {
            task();
            HandlerResult::Continue
        }));
    }

    pub fn post_quit(&self) {
        self.post_task(Box::new(|| HandlerResult::Quit));
    }

    fn post_task(&self, task: UiTask) {
        if self.tx.send(task).is_err() {
            log::debug!("UI loop is gone, dropping task");
        }
    }

    pub fn is_ui_thread(&self) -> bool {
        let owner = self.owner.lock().unwrap_or_else(PoisonError::into_inner);
        *owner == Some(thread::current().id())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Drained {
    pub ran: usize,
    pub quit: bool,
}

pub struct UiLoop {
    rx: Receiver<UiTask>,
    owner: Owner,
}

impl UiLoop {
    pub fn new() -> (Self, UiDispatcher) {
        let (tx, rx) = mpsc::channel();
        let owner: Owner = Arc::new(Mutex::new(None));
        let dispatcher = UiDispatcher {
            tx,
            owner: owner.clone(),
        };
        (Self { rx, owner }, dispatcher)
    }

    /// Makes the calling thread the UI thread.
    pub fn bind(&self) {
        let mut owner = self.owner.lock().unwrap_or_else(PoisonError::into_inner);
        *owner = Some(thread::current().id());
    }

    /// Runs tasks until one asks to quit or every dispatcher is dropped.
    pub fn run(self) {
        self.bind();
        log::debug!("UI loop running");
        while let Ok(task) = self.rx.recv() {
            if task() == HandlerResult::Quit {
                log::info!("UI loop quit requested");
                break;
            }
        }
        *self.owner.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Runs whatever is queued right now.
    pub fn drain(&self) -> Drained {
        self.bind();
        let mut drained = Drained::default();
        while let Ok(task) = self.rx.try_recv() {
            drained.ran += 1;
            if task() == HandlerResult::Quit {
                drained.quit = true;
                break;
            }
        }
        drained
    }

    /// Runs tasks as they arrive for up to `timeout`, stopping early once
    /// `wanted` tasks have run.
    pub fn run_for(&self, timeout: Duration, wanted: usize) -> Drained {
        self.bind();
        let deadline = Instant::now() + timeout;
        let mut drained = Drained::default();
        while drained.ran < wanted {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.rx.recv_timeout(remaining) {
                Ok(task) => {
                    drained.ran += 1;
                    if task() == HandlerResult::Quit {
                        drained.quit = true;
                        break;
                    }
                }
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        drained
    }
}

/// Runs `work` inline, or on a fresh worker thread when called from the UI
/// thread. Worker failures are logged since nobody is waiting for them.
pub(crate) fn off_ui_thread<F>(ui: &UiDispatcher, name: &'static str, work: F) -> Result<(), TrayError>
where
    F: FnOnce() -> Result<(), TrayError> + Send + 'static,
{
    if !ui.is_ui_thread() {
        return work();
    }

    log::debug!("Deferring {} off the UI thread", name);
    thread::Builder::new()
        .name(format!("tray-{}", name))
        .spawn(move || {
            if let Err(e) = work() {
                log::error!("Deferred {} failed: {}", name, e);
            }
        })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn only_bound_thread_is_ui_thread() {
        let (ui_loop, ui) = UiLoop::new();
        assert!(!ui.is_ui_thread());

        ui_loop.bind();
        assert!(ui.is_ui_thread());

        let other = ui.clone();
        let seen_elsewhere = thread::spawn(move || other.is_ui_thread()).join().unwrap();
        assert!(!seen_elsewhere);
    }

    #[test]
    fn drain_runs_posted_tasks_in_order() {
        let (ui_loop, ui) = UiLoop::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        for i in 0..3 {
            let order = order.clone();
            ui.post(move || order.lock().unwrap().push(i));
        }

        let drained = ui_loop.drain();

        assert_eq!(drained, Drained { ran: 3, quit: false });
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn quit_stops_the_loop() {
        let (ui_loop, ui) = UiLoop::new();
        let ran = Arc::new(AtomicUsize::new(0));

        let counter = ran.clone();
        ui.post(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        ui.post_quit();
        let counter = ran.clone();
        ui.post(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let handle = thread::spawn(move || ui_loop.run());
        handle.join().unwrap();

        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn work_runs_inline_off_the_ui_thread() {
        let (_ui_loop, ui) = UiLoop::new();
        let caller = thread::current().id();
        let ran_on = Arc::new(Mutex::new(None));

        let slot = ran_on.clone();
        off_ui_thread(&ui, "test", move || {
            *slot.lock().unwrap() = Some(thread::current().id());
            Ok(())
        })
        .unwrap();

        assert_eq!(*ran_on.lock().unwrap(), Some(caller));
    }

    #[test]
    fn work_moves_to_a_worker_on_the_ui_thread() {
        let (ui_loop, ui) = UiLoop::new();
        ui_loop.bind();
        let (tx, rx) = mpsc::channel();

        off_ui_thread(&ui, "test", move || {
            tx.send(thread::current().id()).unwrap();
            Ok(())
        })
        .unwrap();

        let worker = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_ne!(worker, thread::current().id());
    }

    #[test]
    fn inline_errors_reach_the_caller() {
        let (_ui_loop, ui) = UiLoop::new();
        let result = off_ui_thread(&ui, "test", || Err(TrayError::Unsupported("testing")));
        assert!(matches!(result, Err(TrayError::Unsupported("testing"))));
    }
}
