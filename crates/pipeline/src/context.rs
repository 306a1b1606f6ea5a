//! Handler-facing state of one command execution.

use std::fmt;
use std::sync::Arc;

use domain::{MessageOptions, OptionModifier, Payload};
use tracing::debug;

use crate::exception::Exception;

/// What a command handler sees of its execution.
///
/// A handler publishes at most one event. Once anything is published,
/// further `publish`, `error` and failed `assert` calls do nothing.
pub struct CommandContext {
    exception: Arc<dyn Exception>,
    event_options: MessageOptions,
    event_payload: Option<Box<dyn Payload>>,
    is_error: bool,
}

impl CommandContext {
    pub(crate) fn new(exception: Arc<dyn Exception>, event_options: MessageOptions) -> Self {
        Self {
            exception,
            event_options,
            event_payload: None,
            is_error: false,
        }
    }

    /// Publishes `payload` at the default target: the command's aggregate,
    /// next version.
    pub fn publish<P: Payload>(&mut self, payload: P) {
        self.publish_with(payload, Vec::new());
    }

    /// Publishes `payload` after applying `modifiers` to the target options.
    pub fn publish_with<P: Payload>(
        &mut self,
        payload: P,
        modifiers: impl IntoIterator<Item = OptionModifier>,
    ) {
        if self.event_payload.is_some() {
            return;
        }
        self.event_options.apply(modifiers);
        self.event_payload = Some(Box::new(payload));
    }

    /// Publishes an error event.
    pub fn error(&mut self, message: impl AsRef<str>) {
        if self.event_payload.is_some() {
            return;
        }
        self.force_error(message);
    }

    /// Replaces whatever was published with an error event.
    pub fn force_error(&mut self, message: impl AsRef<str>) {
        let message = message.as_ref();
        debug!(error = message, "Command error published");
        let (payload, options) = self.exception.error(message);
        self.event_payload = Some(payload);
        self.event_options = options;
        self.is_error = true;
    }

    /// Publishes an error unless `predicate` holds.
    pub fn assert(&mut self, predicate: bool, message: impl AsRef<str>) {
        if predicate || self.event_payload.is_some() {
            return;
        }
        self.error(format!("Assert failed: {}", message.as_ref()));
    }

    pub fn has_published(&self) -> bool {
        self.event_payload.is_some()
    }

    /// True when the pending event reports an error.
    pub fn is_error(&self) -> bool {
        self.is_error
    }

    pub fn event_payload(&self) -> Option<&dyn Payload> {
        self.event_payload.as_deref()
    }

    pub fn event_options(&self) -> &MessageOptions {
        &self.event_options
    }

    pub(crate) fn set_event_options(&mut self, options: MessageOptions) {
        self.event_options = options;
    }
}

impl fmt::Debug for CommandContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandContext")
            .field("event_options", &self.event_options)
            .field("event_payload", &self.event_payload)
            .field("is_error", &self.is_error)
            .finish()
    }
}
