//! Collaborators shared by every pipeline invocation.

use std::fmt;
use std::sync::Arc;

use domain::{DomainRegistry, Message};
use event_store::EventStore;

use crate::exception::{Exception, StandardException};
use crate::handlers::HandlerRegistry;
use crate::publisher::{NoopPublisher, Publisher};

/// Everything a pipeline needs, built once at startup.
#[derive(Clone)]
pub struct Dependencies {
    pub registry: Arc<DomainRegistry>,
    pub handlers: Arc<HandlerRegistry>,
    pub event_store: Arc<dyn EventStore>,
    pub publisher: Arc<dyn Publisher>,
    pub exception: Arc<dyn Exception>,
}

impl Dependencies {
    /// Creates dependencies that publish nowhere and report errors through
    /// the system domain.
    pub fn new(
        registry: Arc<DomainRegistry>,
        handlers: HandlerRegistry,
        event_store: Arc<dyn EventStore>,
    ) -> Self {
        Self {
            registry,
            handlers: Arc::new(handlers),
            event_store,
            publisher: Arc::new(NoopPublisher),
            exception: Arc::new(StandardException),
        }
    }

    pub fn with_publisher(mut self, publisher: impl Publisher + 'static) -> Self {
        self.publisher = Arc::new(publisher);
        self
    }

    pub fn with_exception(mut self, exception: impl Exception + 'static) -> Self {
        self.exception = Arc::new(exception);
        self
    }

    /// Runs `command` through the command pipeline.
    pub async fn handle(&self, command: &Message) -> Message {
        crate::command::handle_command(self, command).await
    }
}

impl fmt::Debug for Dependencies {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dependencies")
            .field("source", &self.registry.source_uri())
            .field("handlers", &self.handlers)
            .finish_non_exhaustive()
    }
}
