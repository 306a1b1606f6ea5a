//! Shared test domain.

#![allow(dead_code)]

use std::sync::Arc;

use domain::{Aggregate, DomainDefinition, DomainRegistry, MessageDefinition, MessageGroup, Payload};
use event_store::InMemoryEventStore;
use serde::{Deserialize, Serialize};

pub const VALUE_URI: &str = "github.com/acme/domains/valuechanger/v1";
pub const SOURCE: &str = "test/source";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetValue {
    pub value: String,
}

impl MessageDefinition for SetValue {
    const DOMAIN_URI: &'static str = VALUE_URI;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueSet {
    pub value: String,
}

impl MessageDefinition for ValueSet {
    const DOMAIN_URI: &'static str = VALUE_URI;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Value {
    pub value: String,
}

impl Aggregate for Value {
    fn apply(&mut self, event: &dyn Payload) {
        if let Some(set) = event.downcast_ref::<ValueSet>() {
            self.value = set.value.clone();
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stray {}

impl MessageDefinition for Stray {
    const DOMAIN_URI: &'static str = "github.com/acme/domains/nowhere/v1";
}

pub fn value_set(value: &str) -> ValueSet {
    ValueSet {
        value: value.to_string(),
    }
}

pub fn registry() -> Arc<DomainRegistry> {
    let domain = DomainDefinition::new(VALUE_URI)
        .aggregate::<Value>()
        .commands(MessageGroup::commands().message::<SetValue>())
        .events(MessageGroup::events().message::<ValueSet>())
        .must_compile();
    Arc::new(DomainRegistry::builder(SOURCE).register(domain).build().unwrap())
}

pub fn store() -> (InMemoryEventStore, i32) {
    let registry = registry();
    let domain_id = registry.domain_by_uri(VALUE_URI).unwrap().short_id();
    (InMemoryEventStore::new(registry), domain_id)
}
