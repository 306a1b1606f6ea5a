//! Compiled domains.

use std::any::TypeId;
use std::fmt;

use common::MessageTypeId;

use crate::aggregate::{AggregatePrototype, AggregateState};
use crate::catalog::{MessageType, MessageTypeCatalog};
use crate::payload::Payload;

/// An immutable, compiled domain: one aggregate type plus its message catalog.
#[derive(Debug)]
pub struct Domain {
    pub(crate) uri: String,
    pub(crate) id: i64,
    pub(crate) short_id: i32,
    pub(crate) name: String,
    pub(crate) version: i32,
    pub(crate) aggregate: AggregatePrototype,
    pub(crate) catalog: MessageTypeCatalog,
}

impl Domain {
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Content hash of the URI.
    pub fn id(&self) -> i64 {
        self.id
    }

    /// 32-bit content hash of the URI, used as the header domain id.
    pub fn short_id(&self) -> i32 {
        self.short_id
    }

    /// Second-to-last URI segment.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> i32 {
        self.version
    }

    /// Returns a fresh aggregate state.
    pub fn new_aggregate(&self) -> Box<dyn AggregateState> {
        self.aggregate.create()
    }

    pub fn aggregate_type_id(&self) -> TypeId {
        self.aggregate.type_id()
    }

    pub fn aggregate_type_name(&self) -> &'static str {
        self.aggregate.type_name()
    }

    pub fn message_types(&self) -> &MessageTypeCatalog {
        &self.catalog
    }

    /// Finds the catalog entry for the runtime type of `payload`.
    pub fn message_type(&self, payload: &dyn Payload) -> Option<&MessageType> {
        self.catalog.by_instance(payload)
    }

    /// Resolves `ids` against the whole catalog, skipping unknown ids.
    pub fn messages(&self, ids: &[MessageTypeId]) -> Vec<&MessageType> {
        ids.iter().filter_map(|&id| self.catalog.by_id(id)).collect()
    }

    /// Resolves `ids` against the commands, skipping anything else.
    pub fn commands(&self, ids: &[MessageTypeId]) -> Vec<&MessageType> {
        let commands = self.catalog.commands();
        ids.iter().filter_map(|&id| commands.by_id(id)).collect()
    }

    /// Resolves `ids` against the events, skipping anything else.
    pub fn events(&self, ids: &[MessageTypeId]) -> Vec<&MessageType> {
        let events = self.catalog.events();
        ids.iter().filter_map(|&id| events.by_id(id)).collect()
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} v{} uri[{}] id[{:X}] aggregate[{}]",
            self.name,
            self.version,
            self.uri,
            self.short_id as u32,
            self.aggregate.type_name()
        )?;
        for message in self.catalog.all() {
            writeln!(f, "  {message}")?;
        }
        Ok(())
    }
}
