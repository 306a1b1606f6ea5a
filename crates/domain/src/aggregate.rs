//! Aggregate state traits.

use std::any::{Any, TypeId};
use std::fmt::{self, Debug};

use common::{Codec, JsonCodec, SerializationError};
use serde::{Serialize, de::DeserializeOwned};

use crate::payload::{Payload, short_type_name};

/// Trait for aggregate state in an event-sourced domain.
///
/// A fresh instance is produced by `Default` every time a command is
/// handled; the pipeline then replays the aggregate's event history through
/// [`apply`](Aggregate::apply) in version order.
///
/// `apply` must be deterministic and must not fail: events are facts that
/// already happened. Payloads the aggregate does not care about are ignored.
pub trait Aggregate: Default + Serialize + DeserializeOwned + Debug + Send + Sync + 'static {
    /// Applies one replayed event.
    fn apply(&mut self, event: &dyn Payload);
}

/// Object-safe view of an aggregate, as held by the pipelines.
pub trait AggregateState: Any + Debug + Send + Sync {
    fn apply_event(&mut self, event: &dyn Payload);

    fn encode_state(&self) -> Result<Vec<u8>, SerializationError>;

    fn state_any(&self) -> &dyn Any;
}

impl<A: Aggregate> AggregateState for A {
    fn apply_event(&mut self, event: &dyn Payload) {
        self.apply(event);
    }

    fn encode_state(&self) -> Result<Vec<u8>, SerializationError> {
        JsonCodec::encode(self)
    }

    fn state_any(&self) -> &dyn Any {
        self
    }
}

impl dyn AggregateState {
    /// Returns the concrete state if it is an `A`.
    pub fn downcast_ref<A: Aggregate>(&self) -> Option<&A> {
        self.state_any().downcast_ref::<A>()
    }
}

fn fresh<A: Aggregate>() -> Box<dyn AggregateState> {
    Box::new(A::default())
}

/// Factory for the aggregate type of a domain.
#[derive(Clone, Copy)]
pub struct AggregatePrototype {
    type_id: TypeId,
    type_name: &'static str,
    factory: fn() -> Box<dyn AggregateState>,
}

impl AggregatePrototype {
    pub fn of<A: Aggregate>() -> Self {
        Self {
            type_id: TypeId::of::<A>(),
            type_name: short_type_name::<A>(),
            factory: fresh::<A>,
        }
    }

    /// Returns a fresh, default state.
    pub fn create(&self) -> Box<dyn AggregateState> {
        (self.factory)()
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn is<A: Aggregate>(&self) -> bool {
        self.type_id == TypeId::of::<A>()
    }
}

impl Debug for AggregatePrototype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AggregatePrototype")
            .field("type_name", &self.type_name)
            .finish()
    }
}
