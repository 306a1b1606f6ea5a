use domain::MessageError;
use thiserror::Error;

/// Errors that can occur when interacting with the event store.
#[derive(Debug, Error)]
pub enum EventStoreError {
    /// The aggregate is not at the version the writer expected.
    #[error(
        "Concurrency conflict for aggregate {domain_id:X}/{id:X}: expected version {expected}, found {actual}"
    )]
    ConcurrencyConflict {
        domain_id: i32,
        id: i64,
        expected: i32,
        actual: i32,
    },

    /// Two distinct keys hash to the same aggregate id.
    #[error("Key collision: {key:?} resolves to an id already bound to {existing:?}")]
    KeyCollision { key: String, existing: String },

    #[error("Invalid event key: {0:?}")]
    InvalidEventKey(String),

    /// Only events can be appended.
    #[error("Not an event: {0}")]
    NotAnEvent(String),

    #[error("Unknown domain: {0}")]
    UnknownDomain(String),

    #[error("Unknown message type {name} in domain {domain}")]
    UnknownMessageType { domain: String, name: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] common::SerializationError),

    /// The backend could not serve the request; callers may retry.
    #[error("Event store unavailable: {0}")]
    Unavailable(String),
}

impl From<MessageError> for EventStoreError {
    fn from(error: MessageError) -> Self {
        match error {
            MessageError::UnknownDomain(uri) => Self::UnknownDomain(uri),
            MessageError::UnknownMessageType { domain, name } => {
                Self::UnknownMessageType { domain, name }
            }
            MessageError::Serialization(e) => Self::Serialization(e),
        }
    }
}

/// Result type for event store operations.
pub type Result<T> = std::result::Result<T, EventStoreError>;
