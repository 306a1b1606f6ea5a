//! Wiring of command handlers and services to domains.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use common::{AggregateHeaderData, MessageTypeId};
use domain::{
    Aggregate, AggregateState, DomainRegistry, ErrorRaised, Message, MessageDefinition, Payload,
    RaiseError, SYSTEM_DOMAIN_URI, payload::short_type_name,
};
use tracing::info;

use crate::context::CommandContext;
use crate::error::{Result, WiringError};
use crate::service::ServiceContext;

/// Type-erased command handler of one domain.
pub type CommandHandlerFn = Arc<
    dyn Fn(&mut CommandContext, &AggregateHeaderData, &dyn AggregateState, &Message, &dyn Payload)
        + Send
        + Sync,
>;

/// An event type a service reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subscription {
    domain_uri: &'static str,
    name: &'static str,
}

impl Subscription {
    pub fn to<T: MessageDefinition>() -> Self {
        Self {
            domain_uri: T::DOMAIN_URI,
            name: T::name(),
        }
    }
}

/// A process reacting to events, typically by issuing follow-on commands
/// through [`ServiceContext::publish`].
#[async_trait]
pub trait Service: Send + Sync {
    fn name(&self) -> &str;

    /// URI of the domain owning this service.
    fn domain_uri(&self) -> &str;

    fn subscriptions(&self) -> Vec<Subscription>;

    async fn handle(&self, ctx: &mut ServiceContext<'_>, event: &Message, payload: &dyn Payload);
}

/// Command handlers per domain and services per subscribed event type.
///
/// Domains are keyed by short id and message types by their packed id,
/// since message type ids are only unique within a domain.
pub struct HandlerRegistry {
    commands: HashMap<i32, CommandHandlerFn>,
    services: Vec<Arc<dyn Service>>,
    subscriptions: HashMap<(i32, MessageTypeId), Vec<usize>>,
}

impl HandlerRegistry {
    /// Starts wiring against `registry`. The system command handler is
    /// always included.
    pub fn builder(registry: Arc<DomainRegistry>) -> HandlerRegistryBuilder {
        HandlerRegistryBuilder {
            registry,
            registry_error: None,
            handlers: HandlerRegistry {
                commands: HashMap::new(),
                services: Vec::new(),
                subscriptions: HashMap::new(),
            },
        }
        .command_handler::<domain::ErrorLog, _>(SYSTEM_DOMAIN_URI, system_command_handler)
    }

    pub fn command_handler(&self, domain_id: i32) -> Option<&CommandHandlerFn> {
        self.commands.get(&domain_id)
    }

    /// Services subscribed to the type of `event`.
    pub fn services_for(&self, event: &Message) -> Vec<Arc<dyn Service>> {
        let key = (event.header().domain_id, event.message_type());
        self.subscriptions
            .get(&key)
            .map(|indexes| indexes.iter().map(|&i| Arc::clone(&self.services[i])).collect())
            .unwrap_or_default()
    }

    pub fn services(&self) -> &[Arc<dyn Service>] {
        &self.services
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("command_domains", &self.commands.keys().collect::<Vec<_>>())
            .field(
                "services",
                &self.services.iter().map(|s| s.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Builder for [`HandlerRegistry`]. The first wiring error is reported by
/// [`build`](Self::build).
pub struct HandlerRegistryBuilder {
    registry: Arc<DomainRegistry>,
    registry_error: Option<WiringError>,
    handlers: HandlerRegistry,
}

impl HandlerRegistryBuilder {
    /// Wires the command handler of the domain at `domain_uri`.
    ///
    /// `A` must be the domain's aggregate type.
    pub fn command_handler<A, F>(mut self, domain_uri: &str, handler: F) -> Self
    where
        A: Aggregate,
        F: Fn(&mut CommandContext, &AggregateHeaderData, &A, &Message, &dyn Payload)
            + Send
            + Sync
            + 'static,
    {
        if let Err(e) = self.add_command_handler::<A, F>(domain_uri, handler) {
            self.registry_error.get_or_insert(e);
        }
        self
    }

    /// Wires a service to every event it subscribes to.
    pub fn service(mut self, service: impl Service + 'static) -> Self {
        if let Err(e) = self.add_service(Arc::new(service)) {
            self.registry_error.get_or_insert(e);
        }
        self
    }

    pub fn build(self) -> Result<HandlerRegistry> {
        if let Some(e) = self.registry_error {
            return Err(e);
        }
        info!(
            command_handlers = self.handlers.commands.len(),
            services = self.handlers.services.len(),
            "Handlers wired"
        );
        Ok(self.handlers)
    }

    fn add_command_handler<A, F>(&mut self, domain_uri: &str, handler: F) -> Result<()>
    where
        A: Aggregate,
        F: Fn(&mut CommandContext, &AggregateHeaderData, &A, &Message, &dyn Payload)
            + Send
            + Sync
            + 'static,
    {
        let domain = self
            .registry
            .domain_by_uri(domain_uri)
            .ok_or_else(|| WiringError::UnknownDomain(domain_uri.to_string()))?;

        if domain.aggregate_type_id() != std::any::TypeId::of::<A>() {
            return Err(WiringError::AggregateMismatch {
                domain: domain.uri().to_string(),
                expected: domain.aggregate_type_name(),
                found: short_type_name::<A>(),
            });
        }
        if self.handlers.commands.contains_key(&domain.short_id()) {
            return Err(WiringError::DuplicateHandler(domain.uri().to_string()));
        }

        let erased: CommandHandlerFn = Arc::new(
            move |ctx: &mut CommandContext,
                  header: &AggregateHeaderData,
                  state: &dyn AggregateState,
                  command: &Message,
                  payload: &dyn Payload| {
                match state.downcast_ref::<A>() {
                    Some(state) => handler(ctx, header, state, command, payload),
                    None => ctx.error("Aggregate state has unexpected type"),
                }
            },
        );
        self.handlers.commands.insert(domain.short_id(), erased);
        Ok(())
    }

    fn add_service(&mut self, service: Arc<dyn Service>) -> Result<()> {
        if self.registry.domain_by_uri(service.domain_uri()).is_none() {
            return Err(WiringError::UnknownDomain(service.domain_uri().to_string()));
        }

        let mut keys = Vec::new();
        for subscription in service.subscriptions() {
            let domain = self
                .registry
                .domain_by_uri(subscription.domain_uri)
                .ok_or_else(|| WiringError::UnknownDomain(subscription.domain_uri.to_string()))?;
            let message_type = domain
                .message_types()
                .by_name(subscription.name)
                .ok_or_else(|| WiringError::UnknownMessage {
                    domain: domain.uri().to_string(),
                    name: subscription.name.to_string(),
                })?;
            if message_type.is_command() {
                return Err(WiringError::NotAnEvent(message_type.canonical_name().to_string()));
            }
            keys.push((domain.short_id(), message_type.message_type_id()));
        }

        let index = self.handlers.services.len();
        self.handlers.services.push(service);
        for key in keys {
            self.handlers.subscriptions.entry(key).or_default().push(index);
        }
        Ok(())
    }
}

/// Records raised errors on the error log aggregate.
fn system_command_handler(
    ctx: &mut CommandContext,
    _header: &AggregateHeaderData,
    _state: &domain::ErrorLog,
    _command: &Message,
    payload: &dyn Payload,
) {
    match payload.downcast_ref::<RaiseError>() {
        Some(raise) => ctx.publish(ErrorRaised {
            message: raise.message.clone(),
        }),
        None => ctx.error(format!("Unsupported system command {}", payload.message_name())),
    }
}
