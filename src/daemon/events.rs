use tokio::sync::broadcast;

use super::TrayEvent;

/// Events kept per subscriber before the slowest one starts lagging.
pub const DEFAULT_BUFFER: usize = 64;

/// Fan-out of [`TrayEvent`]s to any number of observers.
///
/// Publishing never blocks the tray; a subscriber that falls more than the
/// buffer behind skips ahead and sees `Lagged` once.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<TrayEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_buffer(DEFAULT_BUFFER)
    }

    /// A zero buffer is raised to one.
    pub fn with_buffer(buffer: usize) -> Self {
        let (tx, _) = broadcast::channel(buffer.max(1));
        Self { tx }
    }

    /// Publishes `event` and returns how many subscribers will see it.
    pub fn send(&self, event: TrayEvent) -> usize {
        match self.tx.send(event) {
            Ok(receivers) => receivers,
            Err(broadcast::error::SendError(event)) => {
                log::trace!("No subscribers for {:?}", event);
                0
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TrayEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
