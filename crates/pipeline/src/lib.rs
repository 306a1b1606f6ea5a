//! Command and event handler pipelines.
//!
//! This crate provides:
//! - `HandlerRegistry`, wiring one command handler per domain and services per event type
//! - `handle_command`, the command pipeline: hydrate, execute, append, publish
//! - `handle_event`, the event pipeline that feeds services and their follow-on commands
//! - the `Exception` and `Publisher` collaborators and an `EventDispatcher`

pub mod command;
pub mod config;
pub mod context;
pub mod deps;
pub mod dispatcher;
pub mod error;
pub mod exception;
pub mod handlers;
pub mod publisher;
pub mod service;

pub use command::handle_command;
pub use config::Config;
pub use context::CommandContext;
pub use deps::Dependencies;
pub use dispatcher::EventDispatcher;
pub use error::{Result, WiringError};
pub use exception::{Exception, StandardException};
pub use handlers::{CommandHandlerFn, HandlerRegistry, HandlerRegistryBuilder, Service, Subscription};
pub use publisher::{ChannelPublisher, NoopPublisher, Publisher, RecordingPublisher};
pub use service::{ServiceContext, handle_event};
