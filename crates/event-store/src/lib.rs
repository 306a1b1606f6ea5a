//! Event store contracts and the in-memory reference store.

pub mod error;
pub mod memory;
pub mod store;

pub use error::{EventStoreError, Result};
pub use memory::InMemoryEventStore;
pub use store::{EventStore, EventStoreReader, EventStoreWriter};
