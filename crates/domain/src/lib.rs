//! Domain layer for the CQRS engine.
//!
//! This crate provides:
//! - `MessageDefinition` and `Aggregate`, implemented by user payload and state types
//! - the domain compiler, which turns a definition into a `Domain` with a message catalog
//! - the `Message` envelope and the options used to address follow-on messages
//! - `DomainRegistry`, the set of domains known to one source, including the system domain

pub mod aggregate;
pub mod catalog;
pub mod compiler;
pub mod domain;
pub mod error;
pub mod message;
pub mod options;
pub mod payload;
pub mod registry;
pub mod system;

pub use aggregate::{Aggregate, AggregatePrototype, AggregateState};
pub use catalog::{CatalogView, MessageType, MessageTypeCatalog, PayloadDecoder};
pub use compiler::{DomainDefinition, MessageGroup, compile, must_compile, normalize_uri};
pub use domain::Domain;
pub use error::{CompileError, MessageError, RegistryError};
pub use message::{Message, MessageData};
pub use options::{MessageOptions, OptionModifier};
pub use payload::{MessageDefinition, Payload};
pub use registry::{DomainRegistry, DomainRegistryBuilder};
pub use system::{ErrorLog, ErrorRaised, RaiseError, SYSTEM_DOMAIN_URI};
