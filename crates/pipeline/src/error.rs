use thiserror::Error;

/// Errors raised while wiring handlers and services to domains.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WiringError {
    #[error("Unknown domain: {0}")]
    UnknownDomain(String),

    #[error("Unknown message {name} in domain {domain}")]
    UnknownMessage { domain: String, name: String },

    /// The handler expects a different aggregate type than the domain declares.
    #[error("Aggregate mismatch for {domain}: domain uses {expected}, handler uses {found}")]
    AggregateMismatch {
        domain: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Duplicate command handler for {0}")]
    DuplicateHandler(String),

    /// Services can only subscribe to events.
    #[error("Not an event: {0}")]
    NotAnEvent(String),
}

/// Result type for handler wiring.
pub type Result<T> = std::result::Result<T, WiringError>;
