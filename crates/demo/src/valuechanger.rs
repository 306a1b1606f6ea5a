//! A single-value aggregate and a janitor service that clears it on request.

use async_trait::async_trait;
use common::{AggregateHeader, AggregateHeaderData, Int64Set, content_hash};
use domain::{
    Aggregate, Domain, DomainDefinition, Message, MessageDefinition, MessageGroup, Payload,
    options,
};
use pipeline::{CommandContext, Service, ServiceContext, Subscription};
use serde::{Deserialize, Serialize};
use tracing::warn;

pub const URI: &str = "github.com/acme/domains/valuechanger/v1";

/// Value that makes the janitor clear the aggregate.
pub const RESET: &str = "reset";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetValue {
    pub value: String,
}

impl MessageDefinition for SetValue {
    const DOMAIN_URI: &'static str = URI;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClearValue {}

impl MessageDefinition for ClearValue {
    const DOMAIN_URI: &'static str = URI;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueSet {
    pub value: String,
    pub previous: String,
}

impl MessageDefinition for ValueSet {
    const DOMAIN_URI: &'static str = URI;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueCleared {
    pub previous: String,
}

impl MessageDefinition for ValueCleared {
    const DOMAIN_URI: &'static str = URI;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Value {
    pub value: String,
    pub changes: u64,
    /// Hashes of every value ever held.
    pub seen: Int64Set,
}

impl Aggregate for Value {
    fn apply(&mut self, event: &dyn Payload) {
        if let Some(set) = event.downcast_ref::<ValueSet>() {
            self.value = set.value.clone();
            self.seen.add(content_hash(set.value.as_bytes()));
            self.changes += 1;
        } else if event.is::<ValueCleared>() {
            self.value.clear();
            self.changes += 1;
        }
    }
}

pub fn definition() -> DomainDefinition {
    DomainDefinition::new(URI)
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

pub fn compile() -> Result<Domain, domain::CompileError> {
    definition().compile()
}

pub fn handle(
    ctx: &mut CommandContext,
    _header: &AggregateHeaderData,
    state: &Value,
    _command: &Message,
    payload: &dyn Payload,
) {
    if let Some(set) = payload.downcast_ref::<SetValue>() {
        ctx.assert(!set.value.is_empty(), "value must not be empty");
        ctx.assert(set.value != state.value, "value unchanged");
        ctx.publish(ValueSet {
            value: set.value.clone(),
            previous: state.value.clone(),
        });
    } else if payload.is::<ClearValue>() {
        ctx.assert(!state.value.is_empty(), "nothing to clear");
        ctx.publish(ValueCleared {
            previous: state.value.clone(),
        });
    }
}

/// Clears any aggregate set to [`RESET`].
pub struct Janitor;

#[async_trait]
impl Service for Janitor {
    fn name(&self) -> &str {
        "janitor"
    }

    fn domain_uri(&self) -> &str {
        URI
    }

    fn subscriptions(&self) -> Vec<Subscription> {
        vec![Subscription::to::<ValueSet>()]
    }

    async fn handle(&self, ctx: &mut ServiceContext<'_>, event: &Message, payload: &dyn Payload) {
        let Some(set) = payload.downcast_ref::<ValueSet>() else {
            return;
        };
        if set.value != RESET {
            return;
        }
        let target = options::id(event.id());
        let version = options::version(event.version() + 1);
        if let Err(e) = ctx.publish(ClearValue {}, vec![target, version]).await {
            warn!(error = %e, "Janitor could not issue ClearValue");
        }
    }
}
