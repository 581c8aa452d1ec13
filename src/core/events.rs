/// Session event bus
///
/// Backends publish session changes here; the bridge's session listener
/// subscribes for the lifetime of the process.

use crate::core::record::SessionChange;
use tokio::sync::broadcast;

/// Maximum number of events buffered per subscriber
const EVENT_BUFFER_SIZE: usize = 100;

/// Event bus for session-change notifications
pub struct EventBus {
    sender: broadcast::Sender<SessionChange>,
}

impl EventBus {
    /// Create a new event bus
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_BUFFER_SIZE);
        Self { sender }
    }

    /// Publish a session change to all subscribers
    pub fn publish(&self, event: SessionChange) {
        // send only fails when nobody is listening, which is fine
        let _ = self.sender.send(event);
    }

    /// Subscribe to session changes
    ///
    /// The receiver sees every change published after this call, buffering
    /// up to EVENT_BUFFER_SIZE of them.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionChange> {
        self.sender.subscribe()
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
