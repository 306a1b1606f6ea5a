//! Sample application wiring the `valuechanger` domain through the engine.

pub mod valuechanger;

use std::sync::Arc;

use domain::{CompileError, DomainRegistry, RegistryError};
use event_store::InMemoryEventStore;
use pipeline::{ChannelPublisher, Config, Dependencies, EventDispatcher, HandlerRegistry, WiringError};
use thiserror::Error;

/// Errors raised while assembling the application.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Domain compilation failed: {0}")]
    Compile(#[from] CompileError),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Wiring error: {0}")]
    Wiring(#[from] WiringError),
}

/// A fully wired engine over an in-memory store.
pub struct App {
    pub deps: Arc<Dependencies>,
    pub store: Arc<InMemoryEventStore>,
    pub dispatcher: EventDispatcher,
}

/// Compiles the domains, wires handlers and connects the dispatcher.
pub fn create_app(config: &Config) -> Result<App, AppError> {
    let registry = Arc::new(
        DomainRegistry::builder(config.source_uri.clone())
            .register(valuechanger::compile()?)
            .build()?,
    );
    let handlers = HandlerRegistry::builder(Arc::clone(&registry))
        .command_handler::<valuechanger::Value, _>(valuechanger::URI, valuechanger::handle)
        .service(valuechanger::Janitor)
        .build()?;

    let store = Arc::new(InMemoryEventStore::new(Arc::clone(&registry)));
    let (publisher, receiver) = ChannelPublisher::channel();
    let deps = Arc::new(
        Dependencies::new(registry, handlers, store.clone()).with_publisher(publisher),
    );
    let dispatcher = EventDispatcher::new(Arc::clone(&deps), receiver);

    Ok(App {
        deps,
        store,
        dispatcher,
    })
}
