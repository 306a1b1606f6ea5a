//! Shared test domains.

#![allow(dead_code)]

use domain::{Aggregate, DomainDefinition, MessageDefinition, MessageGroup, Payload};
use serde::{Deserialize, Serialize};

pub const VALUE_URI: &str = "github.com/acme/domains/valuechanger/v1";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetValue {
    pub value: String,
}

impl MessageDefinition for SetValue {
    const DOMAIN_URI: &'static str = VALUE_URI;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClearValue {}

impl MessageDefinition for ClearValue {
    const DOMAIN_URI: &'static str = VALUE_URI;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueSet {
    pub value: String,
}

impl MessageDefinition for ValueSet {
    const DOMAIN_URI: &'static str = VALUE_URI;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueCleared {}

impl MessageDefinition for ValueCleared {
    const DOMAIN_URI: &'static str = VALUE_URI;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[allow(non_camel_case_types)]
pub struct SetValue_v3 {
    pub value: String,
}

impl MessageDefinition for SetValue_v3 {
    const DOMAIN_URI: &'static str = VALUE_URI;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Value {
    pub value: String,
    pub changes: u32,
}

impl Aggregate for Value {
    fn apply(&mut self, event: &dyn Payload) {
        if let Some(set) = event.downcast_ref::<ValueSet>() {
            self.value = set.value.clone();
            self.changes += 1;
        } else if event.is::<ValueCleared>() {
            self.value.clear();
            self.changes += 1;
        }
    }
}

pub fn value_definition() -> DomainDefinition {
    DomainDefinition::new("tests::valuechanger")
        .uri(VALUE_URI)
        .aggregate::<Value>()
        .commands(
            MessageGroup::commands()
                .message::<SetValue>()
                .message::<ClearValue>(),
        )
        .events(
            MessageGroup::events()
                .message::<ValueSet>()
                .message::<ValueCleared>(),
        )
}

/// A message owned by some other domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Foreign {}

impl MessageDefinition for Foreign {
    const DOMAIN_URI: &'static str = "github.com/acme/domains/other/v1";
}
