//! Pluggable payload serialization.

use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;

/// The single normalized serialization failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("serialization error: {0}")]
pub struct SerializationError(pub String);

impl SerializationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl From<serde_json::Error> for SerializationError {
    fn from(e: serde_json::Error) -> Self {
        Self(e.to_string())
    }
}

/// Encode/decode capability a payload type can choose.
pub trait Codec {
    /// Serializes `value` to bytes.
    fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, SerializationError>;

    /// Deserializes bytes into a fresh value.
    ///
    /// Empty input is an error for every codec.
    fn decode<T: DeserializeOwned>(data: &[u8]) -> Result<T, SerializationError>;
}

/// JSON reference codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, SerializationError> {
        Ok(serde_json::to_vec(value)?)
    }

    fn decode<T: DeserializeOwned>(data: &[u8]) -> Result<T, SerializationError> {
        if data.is_empty() {
            return Err(SerializationError::new("empty payload"));
        }
        Ok(serde_json::from_slice(data)?)
    }
}
