//! Message payload capabilities.

use std::any::Any;
use std::fmt::Debug;

use common::{Codec, JsonCodec, SerializationError};
use serde::{Serialize, de::DeserializeOwned};

/// Capability of a type to act as a command or event payload.
///
/// A message definition names its owning domain, so the compiler can verify
/// that each group member really belongs to the domain being compiled.
/// Encoding defaults to [`JsonCodec`]; override `encode`/`decode` to plug in
/// another format.
pub trait MessageDefinition: Serialize + DeserializeOwned + Debug + Send + Sync + 'static {
    /// URI of the owning domain. `::` separators are accepted and read as `/`.
    const DOMAIN_URI: &'static str;

    /// Display name; the unqualified type name unless overridden.
    fn name() -> &'static str {
        short_type_name::<Self>()
    }

    /// Alternate lookup key for keyed aggregates.
    fn aggregate_key(&self) -> Option<&str> {
        None
    }

    fn encode(&self) -> Result<Vec<u8>, SerializationError> {
        JsonCodec::encode(self)
    }

    fn decode(data: &[u8]) -> Result<Self, SerializationError> {
        JsonCodec::decode(data)
    }
}

/// Object-safe view of a payload, as held by the pipelines.
pub trait Payload: Any + Debug + Send + Sync {
    /// Display name of the payload type.
    fn message_name(&self) -> &'static str;

    /// URI of the owning domain, as declared.
    fn domain_uri(&self) -> &'static str;

    /// Non-empty lookup key, if the payload addresses a keyed aggregate.
    fn key(&self) -> Option<&str>;

    fn encode_payload(&self) -> Result<Vec<u8>, SerializationError>;

    fn as_any(&self) -> &dyn Any;
}

impl<T: MessageDefinition> Payload for T {
    fn message_name(&self) -> &'static str {
        T::name()
    }

    fn domain_uri(&self) -> &'static str {
        T::DOMAIN_URI
    }

    fn key(&self) -> Option<&str> {
        self.aggregate_key().filter(|key| !key.is_empty())
    }

    fn encode_payload(&self) -> Result<Vec<u8>, SerializationError> {
        self.encode()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl dyn Payload {
    /// Returns the concrete payload if it is a `T`.
    pub fn downcast_ref<T: Payload>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    pub fn is<T: Payload>(&self) -> bool {
        self.as_any().is::<T>()
    }
}

/// Unqualified name of `T`: `a::b::SetValue` becomes `SetValue`.
pub fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}
