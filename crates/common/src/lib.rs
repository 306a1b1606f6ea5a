//! Shared primitives for the CQRS engine.
//!
//! This crate holds the leaf pieces every other layer builds on:
//! - [`MessageTypeId`] packing of command/event flag, version and type id
//! - [`AggregateHeader`] binary identity in structured and raw-bytes form
//! - [`Int64Set`] for aggregates tracking link collections
//! - content hashing and the pluggable [`Codec`] serialization capability

pub mod hash;
pub mod header;
pub mod int64set;
pub mod message_type;
pub mod serialization;

pub use hash::{content_hash, content_hash32};
pub use header::{
    AggregateBodyData, AggregateHeader, AggregateHeaderData, HEADER_BYTES, HeaderError,
    new_aggregate,
};
pub use int64set::Int64Set;
pub use message_type::{MessageTypeId, is_command, make_versioned_command_type, make_versioned_event_type};
pub use serialization::{Codec, JsonCodec, SerializationError};
