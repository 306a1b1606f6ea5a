//! Domain error types.

use common::SerializationError;
use thiserror::Error;

/// Errors raised while compiling a domain definition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    /// The URI is not `<segments>/<name>/v<int>` with at least three segments.
    #[error("invalid domain uri: {0}")]
    InvalidDomainUri(String),

    #[error("aggregate not provided")]
    AggregateNotProvided,

    /// The default aggregate state cannot be serialized.
    #[error("invalid aggregate: {0}")]
    InvalidAggregate(String),

    /// The commands group is missing, empty, or holds events.
    #[error("commands not provided")]
    CommandsNotProvided,

    /// The events group is missing, empty, or holds commands.
    #[error("events not provided")]
    EventsNotProvided,

    /// The message does not belong to the domain being compiled.
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// A version tag or `_v` suffix is not an unsigned 8-bit integer.
    #[error("invalid message version: {0}")]
    InvalidMessageVersion(String),

    /// The same message name appears twice in one definition.
    #[error("duplicate message: {0}")]
    DuplicateMessage(String),
}

/// Errors raised while assembling a [`DomainRegistry`](crate::DomainRegistry).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// Two domains share a URI or short id.
    #[error("duplicate domain: {0}")]
    DuplicateDomain(String),

    #[error("system domain failed to compile: {0}")]
    System(#[from] CompileError),
}

/// Errors raised while building a message envelope.
#[derive(Debug, Error)]
pub enum MessageError {
    #[error("unknown domain: {0}")]
    UnknownDomain(String),

    #[error("unknown message type {name} in domain {domain}")]
    UnknownMessageType { domain: String, name: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] SerializationError),
}
