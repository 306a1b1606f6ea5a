//! Options for building follow-on messages.
//!
//! Handlers address the message they publish through a list of
//! [`OptionModifier`]s applied in order to a [`MessageOptions`] value.

use common::{AggregateHeader, content_hash};

use crate::message::Message;

/// Target identity, version and timestamp of an outgoing message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageOptions {
    id: i64,
    key: String,
    version: i32,
    timestamp: i64,
}

impl MessageOptions {
    pub fn new(id: i64, version: i32, timestamp: i64) -> Self {
        Self {
            id,
            key: String::new(),
            version,
            timestamp,
        }
    }

    /// Options targeting a keyed aggregate.
    pub fn keyed(key: impl Into<String>, version: i32, timestamp: i64) -> Self {
        Self {
            id: 0,
            key: key.into(),
            version,
            timestamp,
        }
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Version; anything below 1 reads as 1.
    pub fn version(&self) -> i32 {
        self.version.max(1)
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    /// Explicit id, else the content hash of the key, else 0.
    pub fn resolved_id(&self) -> i64 {
        if self.id != 0 {
            self.id
        } else if !self.key.is_empty() {
            content_hash(self.key.as_bytes())
        } else {
            0
        }
    }

    pub fn set_id(&mut self, id: i64) {
        self.id = id;
    }

    /// Sets the key and clears any explicit id.
    pub fn set_key(&mut self, key: impl Into<String>) {
        self.key = key.into();
        self.id = 0;
    }

    pub fn set_version(&mut self, version: i32) {
        self.version = version;
    }

    pub fn set_timestamp(&mut self, timestamp: i64) {
        self.timestamp = timestamp;
    }

    /// Applies `modifiers` in order.
    pub fn apply(&mut self, modifiers: impl IntoIterator<Item = OptionModifier>) {
        for modifier in modifiers {
            modifier(self);
        }
    }
}

/// One mutation of [`MessageOptions`].
pub type OptionModifier = Box<dyn FnOnce(&mut MessageOptions) + Send>;

pub fn id(id: i64) -> OptionModifier {
    Box::new(move |o| o.set_id(id))
}

pub fn key(key: impl Into<String>) -> OptionModifier {
    let key = key.into();
    Box::new(move |o| o.set_key(key))
}

pub fn version(version: i32) -> OptionModifier {
    Box::new(move |o| o.set_version(version))
}

pub fn timestamp(timestamp: i64) -> OptionModifier {
    Box::new(move |o| o.set_timestamp(timestamp))
}

/// Replaces every option at once.
pub fn with_options(options: MessageOptions) -> OptionModifier {
    Box::new(move |o| *o = options)
}

/// Targets the most recent cause of `message`.
pub fn origin_id(message: &Message) -> OptionModifier {
    origin_stack(message, 0)
}

/// Targets the aggregate `index` steps back in the causation chain,
/// counting from the most recent cause. Out of range is a no-op.
pub fn origin_stack(message: &Message, index: usize) -> OptionModifier {
    let origin = message.origin().get(index).map(|o| o.id());
    Box::new(move |o| {
        if let Some(origin) = origin {
            o.set_id(origin);
        }
    })
}

/// Targets the aggregate `index` steps into the causation chain,
/// counting from the root cause. Out of range is a no-op.
pub fn origin_queue(message: &Message, index: usize) -> OptionModifier {
    let chain = message.origin();
    let origin = chain
        .len()
        .checked_sub(index + 1)
        .and_then(|i| chain.get(i))
        .map(|o| o.id());
    Box::new(move |o| {
        if let Some(origin) = origin {
            o.set_id(origin);
        }
    })
}
