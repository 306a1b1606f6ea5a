//! Command handler pipeline.
//!
//! One invocation moves through these stages:
//!
//! ```text
//! Created -> Hydrating -> Ready | HydrationFailed -> Executing
//!         -> Published | ErrorPublished -> Appended | AppendFatal
//! ```
//!
//! Hydration loads the aggregate's history (one retry) and replays it over
//! a fresh state. The domain's handler runs once and publishes at most one
//! event. Finalization always appends exactly one event: the published one,
//! or an error. If that append fails, an error event is appended instead;
//! a second failure panics, since the store and the caller no longer agree.

use std::any::Any;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::Instant;

use common::{AggregateHeader, AggregateHeaderData, content_hash};
use domain::{AggregateState, Domain, Message, MessageOptions, Payload};
use event_store::EventStoreError;
use tracing::{Span, debug, error, warn};

use crate::context::CommandContext;
use crate::deps::Dependencies;
use crate::handlers::CommandHandlerFn;

/// Progress of one command through the pipeline, recorded as the `stage`
/// field of the `handle_command` span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Stage {
    Created,
    Hydrating,
    Ready,
    HydrationFailed,
    Executing,
    Published,
    ErrorPublished,
    Appended,
    AppendFatal,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// How the target aggregate is addressed.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Identity {
    Id(i64),
    Key(String),
}

impl Identity {
    fn of(payload: &dyn Payload, id: i64) -> Self {
        match payload.key() {
            Some(key) => Self::Key(key.to_string()),
            None => Self::Id(id),
        }
    }

    fn aggregate_id(&self) -> i64 {
        match self {
            Self::Id(id) => *id,
            Self::Key(key) => content_hash(key.as_bytes()),
        }
    }
}

struct Hydrated {
    domain: Arc<Domain>,
    handler: CommandHandlerFn,
    payload: Box<dyn Payload>,
    header: AggregateHeaderData,
    state: Box<dyn AggregateState>,
}

struct CommandExecution<'a> {
    deps: &'a Dependencies,
    command: &'a Message,
    context: CommandContext,
    stage: Stage,
}

/// Handles `command` and returns the appended event.
///
/// Every outcome short of a double append failure is an appended event;
/// failures become error events.
#[tracing::instrument(skip(deps, command), fields(command = %command, stage = tracing::field::Empty))]
pub async fn handle_command(deps: &Dependencies, command: &Message) -> Message {
    let started = Instant::now();
    metrics::counter!("commands_handled_total").increment(1);

    let mut execution = CommandExecution::new(deps, command);

    if let Some(hydrated) = execution.hydrate().await {
        execution.execute(hydrated);
    }
    let result = execution.finalize().await;

    metrics::histogram!("command_duration_seconds").record(started.elapsed().as_secs_f64());
    result
}

impl<'a> CommandExecution<'a> {
    fn new(deps: &'a Dependencies, command: &'a Message) -> Self {
        Self {
            deps,
            command,
            context: CommandContext::new(deps.exception.clone(), MessageOptions::new(0, 1, 0)),
            stage: Stage::Created,
        }
    }

    fn enter(&mut self, stage: Stage) {
        self.stage = stage;
        Span::current().record("stage", tracing::field::display(stage));
    }

    fn fail(&mut self, stage: Stage, message: String) -> Option<Hydrated> {
        warn!(stage = %stage, error = %message, "Command failed before execution");
        self.enter(stage);
        self.context.error(message);
        None
    }

    async fn hydrate(&mut self) -> Option<Hydrated> {
        let deps = self.deps;
        let command = self.command;

        let Some(domain) = deps.registry.domain(command.domain_id()).cloned() else {
            return self.fail(
                Stage::Created,
                format!("Unknown domain [ {:X} ]", command.domain_id() as u32),
            );
        };
        let Some(message_type) = domain.message_types().commands().by_id(command.message_type())
        else {
            return self.fail(
                Stage::Created,
                format!("Unknown command type [ {} ] in {}", command.message_type(), domain.uri()),
            );
        };
        let payload = match message_type.extract(command) {
            Ok(payload) => payload,
            Err(e) => {
                return self.fail(
                    Stage::Created,
                    format!("Unable to extract command payload: [ {e} ]"),
                );
            }
        };
        let Some(handler) = deps.handlers.command_handler(domain.short_id()).cloned() else {
            return self.fail(
                Stage::Created,
                format!("No command handler for {}", domain.uri()),
            );
        };

        self.enter(Stage::Hydrating);
        let identity = Identity::of(payload.as_ref(), command.id());
        let events = match self.load(&domain, &identity).await {
            Ok(events) => events,
            Err(first) => {
                metrics::counter!("command_hydration_retries_total").increment(1);
                warn!(error = %first, "Loading aggregate events failed, retrying");
                match self.load(&domain, &identity).await {
                    Ok(events) => events,
                    Err(e) => {
                        return self.fail(
                            Stage::HydrationFailed,
                            format!("Error loading aggregate events [ {e} ]"),
                        );
                    }
                }
            }
        };

        let id = identity.aggregate_id();
        let current = events.len() as i32;
        self.context.set_event_options(MessageOptions::new(id, current + 1, 0));

        let mut state = domain.new_aggregate();
        let replayable = domain.message_types().events();
        for (i, event) in events.iter().enumerate() {
            let decoded = replayable
                .by_id(event.message_type())
                .ok_or_else(|| format!("unknown event type {}", event.message_type()))
                .and_then(|m| m.extract(event).map_err(|e| e.to_string()));
            match decoded {
                Ok(payload) => state.apply_event(payload.as_ref()),
                Err(e) => {
                    return self.fail(
                        Stage::HydrationFailed,
                        format!("Error extracting event [ {i} ] [ {event} ]: {e}"),
                    );
                }
            }
        }

        self.enter(Stage::Ready);
        debug!(domain = domain.name(), id, version = current, "Aggregate hydrated");
        Some(Hydrated {
            header: AggregateHeaderData::new(
                deps.registry.source_id(),
                domain.short_id(),
                id,
                current,
            ),
            domain,
            handler,
            payload,
            state,
        })
    }

    async fn load(
        &self,
        domain: &Domain,
        identity: &Identity,
    ) -> Result<Vec<Message>, EventStoreError> {
        let store = &self.deps.event_store;
        match identity {
            Identity::Id(id) => store.get_aggregate_events(domain.short_id(), *id, 0).await,
            Identity::Key(key) => {
                store
                    .get_keyed_aggregate_events(domain.short_id(), key, 0)
                    .await
            }
        }
    }

    fn execute(&mut self, hydrated: Hydrated) {
        if self.context.has_published() {
            return;
        }
        self.enter(Stage::Executing);

        let Hydrated {
            domain,
            handler,
            payload,
            header,
            state,
        } = hydrated;
        let command = self.command;
        let ctx = &mut self.context;
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            handler(ctx, &header, state.as_ref(), command, payload.as_ref())
        }));

        if let Err(panic) = outcome {
            let reason = panic_message(panic.as_ref());
            error!(domain = domain.name(), panic = %reason, "Command handler panicked");
            self.context.error(format!("Command handler panicked: {reason}"));
        }
    }

    async fn finalize(&mut self) -> Message {
        if !self.context.has_published() {
            self.context.error("Error event not published in handler");
        }
        if self.context.is_error() {
            metrics::counter!("command_errors_total").increment(1);
            self.enter(Stage::ErrorPublished);
        } else {
            self.enter(Stage::Published);
        }

        let result = match self.append().await {
            Ok(message) => message,
            Err(first) => {
                metrics::counter!("command_append_retries_total").increment(1);
                warn!(error = %first, "Appending event failed, appending error instead");
                self.context.force_error(format!("Error appending event [ {first} ]"));
                match self.append().await {
                    Ok(message) => message,
                    Err(e) => {
                        self.enter(Stage::AppendFatal);
                        error!(stage = %self.stage, error = %e, "Appending error event failed");
                        panic!("event append failed twice for command {}: {e}", self.command);
                    }
                }
            }
        };

        self.enter(Stage::Appended);
        debug!(stage = %self.stage, event = %result, "Command handled");
        self.deps.publisher.publish(&result);
        result
    }

    async fn append(&self) -> Result<Message, EventStoreError> {
        let Some(payload) = self.context.event_payload() else {
            return Err(EventStoreError::Unavailable("no event to append".to_string()));
        };
        let store = &self.deps.event_store;
        let origin = self.command.origin();

        match payload.key() {
            Some(key) => store.append_keyed_event(key, origin, payload).await,
            None => {
                let options = self.context.event_options();
                store
                    .append_event(options.resolved_id(), options.version(), origin, payload)
                    .await
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
