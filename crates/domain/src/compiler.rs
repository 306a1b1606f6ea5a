//! Domain definition and compilation.
//!
//! A [`DomainDefinition`] names an aggregate type plus a group of commands
//! and a group of events. Compiling it validates the definition, derives the
//! canonical name, version and [`MessageTypeId`] of every member, and
//! produces an immutable [`Domain`].
//!
//! ```ignore
//! let domain = domain_definition!()
//!     .aggregate::<Value>()
//!     .commands(MessageGroup::commands().message::<SetValue>())
//!     .events(MessageGroup::events().message::<ValueSet>())
//!     .compile()?;
//! ```

use std::borrow::Cow;
use std::sync::Arc;

use common::{content_hash, content_hash32, make_versioned_command_type, make_versioned_event_type};
use tracing::debug;

use crate::aggregate::{Aggregate, AggregatePrototype};
use crate::catalog::{MessageType, MessageTypeCatalog, PayloadDecoder, decode_as};
use crate::domain::Domain;
use crate::error::CompileError;
use crate::payload::MessageDefinition;

/// Starts a definition located at the calling module.
#[macro_export]
macro_rules! domain_definition {
    () => {
        $crate::DomainDefinition::new(module_path!())
    };
}

/// Reads `::` path separators as `/`.
pub fn normalize_uri(uri: &str) -> Cow<'_, str> {
    if uri.contains("::") {
        Cow::Owned(uri.replace("::", "/"))
    } else {
        Cow::Borrowed(uri)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GroupKind {
    Commands,
    Events,
}

#[derive(Debug, Clone)]
struct MessageSpec {
    name: &'static str,
    domain_uri: &'static str,
    version_tag: Option<String>,
    decoder: PayloadDecoder,
}

/// An ordered group of command or event types.
#[derive(Debug, Clone)]
pub struct MessageGroup {
    kind: GroupKind,
    members: Vec<MessageSpec>,
}

impl MessageGroup {
    pub fn commands() -> Self {
        Self {
            kind: GroupKind::Commands,
            members: Vec::new(),
        }
    }

    pub fn events() -> Self {
        Self {
            kind: GroupKind::Events,
            members: Vec::new(),
        }
    }

    /// Adds `T`, versioned by its `_v<n>` name suffix or 1.
    pub fn message<T: MessageDefinition>(mut self) -> Self {
        self.members.push(Self::spec::<T>(None));
        self
    }

    /// Adds `T` with an explicit version tag.
    pub fn message_with_version<T: MessageDefinition>(mut self, version: impl Into<String>) -> Self {
        self.members.push(Self::spec::<T>(Some(version.into())));
        self
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    fn spec<T: MessageDefinition>(version_tag: Option<String>) -> MessageSpec {
        MessageSpec {
            name: T::name(),
            domain_uri: T::DOMAIN_URI,
            version_tag,
            decoder: decode_as::<T>,
        }
    }
}

/// Builder for a [`Domain`].
#[derive(Debug, Clone)]
pub struct DomainDefinition {
    location: String,
    uri: Option<String>,
    aggregate: Option<AggregatePrototype>,
    commands: Option<MessageGroup>,
    events: Option<MessageGroup>,
}

impl DomainDefinition {
    /// Creates a definition whose default URI is `location` with `::` read as `/`.
    ///
    /// Use [`domain_definition!`](crate::domain_definition) to pass the
    /// calling module path.
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            uri: None,
            aggregate: None,
            commands: None,
            events: None,
        }
    }

    /// Overrides the URI derived from the location.
    pub fn uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }

    pub fn aggregate<A: Aggregate>(mut self) -> Self {
        self.aggregate = Some(AggregatePrototype::of::<A>());
        self
    }

    pub fn commands(mut self, group: MessageGroup) -> Self {
        self.commands = Some(group);
        self
    }

    pub fn events(mut self, group: MessageGroup) -> Self {
        self.events = Some(group);
        self
    }

    /// Returns the URI this definition compiles to.
    pub fn resolved_uri(&self) -> String {
        match &self.uri {
            Some(uri) if !uri.is_empty() => normalize_uri(uri).into_owned(),
            _ => normalize_uri(&self.location).into_owned(),
        }
    }

    pub fn compile(self) -> Result<Domain, CompileError> {
        compile(self)
    }

    /// Compiles or panics.
    pub fn must_compile(self) -> Domain {
        must_compile(self)
    }
}

/// Validates `definition` and builds its [`Domain`].
pub fn compile(definition: DomainDefinition) -> Result<Domain, CompileError> {
    let aggregate = definition.aggregate.ok_or(CompileError::AggregateNotProvided)?;
    aggregate
        .create()
        .encode_state()
        .map_err(|e| CompileError::InvalidAggregate(format!("{}: {e}", aggregate.type_name())))?;

    let uri = definition.resolved_uri();
    let (name, version) = parse_domain_uri(&uri)?;

    let commands = definition
        .commands
        .filter(|g| g.kind == GroupKind::Commands && !g.is_empty())
        .ok_or(CompileError::CommandsNotProvided)?;
    let events = definition
        .events
        .filter(|g| g.kind == GroupKind::Events && !g.is_empty())
        .ok_or(CompileError::EventsNotProvided)?;

    let id = content_hash(uri.as_bytes());
    let short_id = content_hash32(uri.as_bytes());
    let domain_uri: Arc<str> = Arc::from(uri.as_str());

    let mut entries = Vec::with_capacity(commands.len() + events.len());
    for (group, is_command) in [(&commands, true), (&events, false)] {
        for spec in &group.members {
            let entry = compile_message(spec, is_command, id, &domain_uri)?;
            if entries
                .iter()
                .any(|e: &MessageType| e.display_name == entry.display_name || e.canonical_name == entry.canonical_name)
            {
                return Err(CompileError::DuplicateMessage(spec.name.to_string()));
            }
            entries.push(entry);
        }
    }

    debug!(uri = %uri, messages = entries.len(), "Domain compiled");

    Ok(Domain {
        uri,
        id,
        short_id,
        name,
        version,
        aggregate,
        catalog: MessageTypeCatalog::new(entries),
    })
}

/// Compiles or panics with the compile error.
pub fn must_compile(definition: DomainDefinition) -> Domain {
    match compile(definition) {
        Ok(domain) => domain,
        Err(e) => panic!("domain failed to compile: {e}"),
    }
}

/// Splits `<segments>/<name>/v<int>` into name and version.
fn parse_domain_uri(uri: &str) -> Result<(String, i32), CompileError> {
    let invalid = || CompileError::InvalidDomainUri(uri.to_string());

    let tokens: Vec<&str> = uri.split('/').collect();
    if tokens.len() < 3 {
        return Err(invalid());
    }
    let version = tokens[tokens.len() - 1]
        .strip_prefix('v')
        .and_then(|v| v.parse::<i32>().ok())
        .ok_or_else(invalid)?;

    Ok((tokens[tokens.len() - 2].to_string(), version))
}

/// Version from an explicit tag, else a `_v<n>` name suffix, else 1.
fn message_version(spec: &MessageSpec, lower_name: &str) -> Result<u8, CompileError> {
    let invalid = |value: &str| CompileError::InvalidMessageVersion(format!("{}: {value}", spec.name));

    if let Some(tag) = &spec.version_tag {
        return tag.parse::<u8>().map_err(|_| invalid(tag));
    }
    match lower_name.rfind("_v") {
        Some(i) if i > 0 => {
            let suffix = &lower_name[i + 2..];
            suffix.parse::<u8>().map_err(|_| invalid(suffix))
        }
        _ => Ok(1),
    }
}

fn compile_message(
    spec: &MessageSpec,
    is_command: bool,
    domain_id: i64,
    domain_uri: &Arc<str>,
) -> Result<MessageType, CompileError> {
    let lower_name = spec.name.to_lowercase();
    let version = message_version(spec, &lower_name)?;
    let canonical_name = format!("{lower_name}_v{version}");

    if normalize_uri(spec.domain_uri) != **domain_uri {
        return Err(CompileError::InvalidMessage(format!(
            "{} belongs to {}",
            spec.name, spec.domain_uri
        )));
    }

    let id = content_hash(canonical_name.as_bytes());
    let message_type_id = if is_command {
        make_versioned_command_type(id, version)
    } else {
        make_versioned_event_type(id, version)
    };

    Ok(MessageType {
        domain_id,
        domain_uri: Arc::clone(domain_uri),
        is_command,
        message_type_id,
        display_name: spec.name,
        lower_name,
        canonical_name,
        version,
        id,
        decoder: spec.decoder,
    })
}
