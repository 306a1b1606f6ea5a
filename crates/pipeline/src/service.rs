//! Event handler pipeline.

use std::sync::Arc;

use chrono::Utc;
use common::AggregateHeader;
use domain::{Domain, Message, MessageError, MessageOptions, OptionModifier, Payload};
use tracing::{debug, error};

use crate::command::handle_command;
use crate::deps::Dependencies;
use crate::handlers::Service;

/// What a service sees while handling one event.
pub struct ServiceContext<'a> {
    deps: &'a Dependencies,
    domain: Arc<Domain>,
    event: &'a Message,
}

impl<'a> ServiceContext<'a> {
    /// Domain owning the service.
    pub fn domain(&self) -> &Domain {
        &self.domain
    }

    /// The event being handled.
    pub fn event(&self) -> &'a Message {
        self.event
    }

    /// Issues a follow-on command caused by the current event and runs it
    /// through the command pipeline of the command's own domain.
    ///
    /// The command's causation chain is the event's header followed by the
    /// event's own chain.
    pub async fn publish<P: Payload>(
        &mut self,
        payload: P,
        modifiers: impl IntoIterator<Item = OptionModifier>,
    ) -> Result<Message, MessageError> {
        let mut options = MessageOptions::new(0, 0, 0);
        options.apply(modifiers);
        self.dispatch(&payload, options).await
    }

    /// Issues an error command caused by the current event.
    pub async fn error(&mut self, message: impl AsRef<str>) -> Result<Message, MessageError> {
        let (payload, options) = self.deps.exception.error_command(message.as_ref());
        self.dispatch(payload.as_ref(), options).await
    }

    async fn dispatch(
        &self,
        payload: &dyn Payload,
        options: MessageOptions,
    ) -> Result<Message, MessageError> {
        let mut origin = Vec::with_capacity(self.event.origin().len() + 1);
        origin.push(self.event.header().to_raw());
        origin.extend_from_slice(self.event.origin());

        let timestamp = match options.timestamp() {
            0 => Utc::now().timestamp_nanos_opt().unwrap_or_default(),
            ts => ts,
        };
        let command = self.deps.registry.new_message(
            options.resolved_id(),
            options.version(),
            timestamp,
            &origin,
            payload,
        )?;

        debug!(
            cause = %self.event,
            command = payload.message_name(),
            id = command.id(),
            "Service issued command"
        );
        Ok(handle_command(self.deps, &command).await)
    }
}

/// Runs `service` on `event`.
///
/// The payload is decoded through the event's own domain. Persisted events
/// are well-formed by construction, so a decode failure panics.
#[tracing::instrument(skip(deps, service, event), fields(service = service.name(), event = %event))]
pub async fn handle_event(deps: &Dependencies, service: &dyn Service, event: &Message) {
    let Some(event_domain) = deps.registry.domain(event.domain_id()) else {
        panic!("event {event} belongs to an unregistered domain");
    };
    let Some(message_type) = event_domain.message_types().events().by_id(event.message_type())
    else {
        panic!("event {event} has unknown type {}", event.message_type());
    };
    let payload = match message_type.extract(event) {
        Ok(payload) => payload,
        Err(e) => {
            error!(error = %e, "Persisted event cannot be decoded");
            panic!("event {event} cannot be decoded: {e}");
        }
    };
    let Some(domain) = deps.registry.domain_by_uri(service.domain_uri()).cloned() else {
        panic!("service {} belongs to an unregistered domain", service.name());
    };

    let mut ctx = ServiceContext {
        deps,
        domain,
        event,
    };
    service.handle(&mut ctx, event, payload.as_ref()).await;
    metrics::counter!("events_dispatched_total").increment(1);
}
