//! Distribution of appended events.

use std::sync::{Arc, Mutex};

use domain::Message;
use tokio::sync::mpsc;
use tracing::warn;

/// Fire-and-forget distribution of persisted messages.
pub trait Publisher: Send + Sync {
    fn publish(&self, message: &Message);
}

/// Drops every message.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopPublisher;

impl Publisher for NoopPublisher {
    fn publish(&self, _message: &Message) {}
}

/// Keeps every published message, in order.
#[derive(Debug, Clone, Default)]
pub struct RecordingPublisher {
    messages: Arc<Mutex<Vec<Message>>>,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of everything published so far.
    pub fn messages(&self) -> Vec<Message> {
        self.messages
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn len(&self) -> usize {
        self.messages
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Publisher for RecordingPublisher {
    fn publish(&self, message: &Message) {
        self.messages
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(message.clone());
    }
}

/// Forwards messages to an unbounded channel, usually drained by an
/// [`EventDispatcher`](crate::EventDispatcher).
#[derive(Debug, Clone)]
pub struct ChannelPublisher {
    sender: mpsc::UnboundedSender<Message>,
}

impl ChannelPublisher {
    /// Creates a publisher and the receiving end of its channel.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Message>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl Publisher for ChannelPublisher {
    fn publish(&self, message: &Message) {
        if self.sender.send(message.clone()).is_err() {
            warn!(message = %message, "Event channel closed, message dropped");
        }
    }
}
