//! Error payload factory.

use domain::{ErrorRaised, MessageOptions, Payload, RaiseError};
use uuid::Uuid;

/// Builds the payloads used to report failures.
///
/// Each report targets its own aggregate, so an error can always be
/// appended even when the failing aggregate is unusable.
pub trait Exception: Send + Sync {
    /// An error event and the options addressing it.
    fn error(&self, message: &str) -> (Box<dyn Payload>, MessageOptions);

    /// An error command and the options addressing it.
    fn error_command(&self, message: &str) -> (Box<dyn Payload>, MessageOptions);
}

/// Reports errors through the system domain, one fresh aggregate per error.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardException;

impl StandardException {
    fn options() -> MessageOptions {
        MessageOptions::new(random_id(), 1, 0)
    }
}

impl Exception for StandardException {
    fn error(&self, message: &str) -> (Box<dyn Payload>, MessageOptions) {
        let payload = ErrorRaised {
            message: message.to_string(),
        };
        (Box::new(payload), Self::options())
    }

    fn error_command(&self, message: &str) -> (Box<dyn Payload>, MessageOptions) {
        let payload = RaiseError {
            message: message.to_string(),
        };
        (Box::new(payload), Self::options())
    }
}

fn random_id() -> i64 {
    match Uuid::new_v4().as_u128() as i64 {
        0 => 1,
        id => id,
    }
}
