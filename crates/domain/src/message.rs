//! Message envelope.
//!
//! Every command and event travels as a [`Message`]: the target aggregate
//! header, the causation chain of headers that led to it, a timestamp, the
//! packed [`MessageTypeId`] and the encoded payload.

use std::fmt;
use std::ops::Deref;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use common::{
    AggregateBodyData, AggregateHeader, AggregateHeaderData, MessageTypeId, SerializationError,
    content_hash, make_versioned_command_type, make_versioned_event_type,
};
use serde::{Deserialize, Serialize};

use crate::domain::Domain;
use crate::error::MessageError;
use crate::payload::{MessageDefinition, Payload};

/// Envelope fields as stored and transmitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageData {
    #[serde(rename = "_agg")]
    aggregate: AggregateHeaderData,
    #[serde(rename = "_orig", default)]
    origin: Vec<AggregateBodyData>,
    #[serde(rename = "_ts")]
    timestamp: i64,
    #[serde(rename = "_type")]
    message_type: MessageTypeId,
    #[serde(rename = "_data")]
    data: Vec<u8>,
}

impl MessageData {
    /// Target aggregate header.
    pub fn header(&self) -> &AggregateHeaderData {
        &self.aggregate
    }

    /// Causation chain; empty for messages with no cause.
    pub fn origin(&self) -> &[AggregateBodyData] {
        &self.origin
    }

    /// Nanoseconds since the Unix epoch.
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn message_type(&self) -> MessageTypeId {
        self.message_type
    }

    /// Encoded payload.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn is_command(&self) -> bool {
        self.message_type.is_command()
    }
}

/// Shared, immutable message.
///
/// Cloning is cheap; every clone refers to the same [`MessageData`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "MessageData", into = "MessageData")]
pub struct Message(Arc<MessageData>);

impl Message {
    /// Builds an envelope for `payload` in `domain`.
    ///
    /// `origins` is copied; pass an empty slice for a message with no cause.
    pub fn new(
        source_id: i64,
        domain: &Domain,
        id: i64,
        version: i32,
        timestamp: i64,
        origins: &[AggregateBodyData],
        payload: &dyn Payload,
    ) -> Result<Self, MessageError> {
        let message_type = domain
            .message_type(payload)
            .ok_or_else(|| MessageError::UnknownMessageType {
                domain: domain.uri().to_string(),
                name: payload.message_name().to_string(),
            })?;
        let data = payload.encode_payload()?;

        Ok(Self(Arc::new(MessageData {
            aggregate: AggregateHeaderData::new(source_id, domain.short_id(), id, version),
            origin: origins.to_vec(),
            timestamp,
            message_type: message_type.message_type_id(),
            data,
        })))
    }

    /// Returns the shared record backing this message.
    pub fn reference(&self) -> Arc<MessageData> {
        Arc::clone(&self.0)
    }

    /// Decodes the payload as `T`.
    ///
    /// The message type must be `T` at the carried version. Type mismatches,
    /// empty payloads and decoder panics are reported as errors.
    pub fn extract<T: MessageDefinition>(&self) -> Result<T, SerializationError> {
        if !carries::<T>(self.0.message_type) {
            return Err(SerializationError::new(format!(
                "message type {} is not {}",
                self.0.message_type,
                T::name()
            )));
        }
        if self.0.data.is_empty() {
            return Err(SerializationError::new("empty payload"));
        }
        match catch_unwind(AssertUnwindSafe(|| T::decode(&self.0.data))) {
            Ok(result) => result,
            Err(_) => Err(SerializationError::new(format!(
                "decoder panicked for {}",
                T::name()
            ))),
        }
    }
}

/// True when `message_type` is the id `T` compiles to at the version it carries.
fn carries<T: MessageDefinition>(message_type: MessageTypeId) -> bool {
    let version = message_type.version();
    let canonical_name = format!("{}_v{version}", T::name().to_lowercase());
    let id = content_hash(canonical_name.as_bytes());
    let expected = if message_type.is_command() {
        make_versioned_command_type(id, version)
    } else {
        make_versioned_event_type(id, version)
    };
    expected == message_type
}

impl Deref for Message {
    type Target = MessageData;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<MessageData> for Message {
    fn from(data: MessageData) -> Self {
        Self(Arc::new(data))
    }
}

impl From<Message> for MessageData {
    fn from(message: Message) -> Self {
        Arc::unwrap_or_clone(message.0)
    }
}

impl AggregateHeader for Message {
    fn source_id(&self) -> i64 {
        self.0.aggregate.source_id
    }

    fn domain_id(&self) -> i32 {
        self.0.aggregate.domain_id
    }

    fn id(&self) -> i64 {
        self.0.aggregate.id
    }

    fn version(&self) -> i32 {
        self.0.aggregate.version
    }

    fn uuid(&self) -> Vec<u8> {
        self.0.aggregate.uuid()
    }

    fn body(&self) -> AggregateHeaderData {
        self.0.aggregate
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let header = &self.0.aggregate;
        write!(
            f,
            "{:X}|{:X}|ID:{:X}|V:{:X}",
            header.source_id as u64,
            header.domain_id as u32,
            header.id as u64,
            header.version as u32
        )
    }
}
