//! Compiled message types and their lookup tables.

use std::collections::HashMap;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use common::{MessageTypeId, SerializationError};

use crate::compiler::normalize_uri;
use crate::message::Message;
use crate::payload::{MessageDefinition, Payload};

/// Decodes payload bytes into a boxed payload of one concrete type.
pub type PayloadDecoder = fn(&[u8]) -> Result<Box<dyn Payload>, SerializationError>;

pub(crate) fn decode_as<T: MessageDefinition>(
    data: &[u8],
) -> Result<Box<dyn Payload>, SerializationError> {
    Ok(Box::new(T::decode(data)?))
}

/// Metadata for one compiled command or event type.
#[derive(Debug, Clone)]
pub struct MessageType {
    pub(crate) domain_id: i64,
    pub(crate) domain_uri: Arc<str>,
    pub(crate) is_command: bool,
    pub(crate) message_type_id: MessageTypeId,
    pub(crate) display_name: &'static str,
    pub(crate) lower_name: String,
    pub(crate) canonical_name: String,
    pub(crate) version: u8,
    pub(crate) id: i64,
    pub(crate) decoder: PayloadDecoder,
}

impl MessageType {
    /// Content hash of the owning domain URI.
    pub fn domain_id(&self) -> i64 {
        self.domain_id
    }

    pub fn domain_uri(&self) -> &str {
        &self.domain_uri
    }

    pub fn is_command(&self) -> bool {
        self.is_command
    }

    pub fn message_type_id(&self) -> MessageTypeId {
        self.message_type_id
    }

    /// Type name as declared, e.g. `SetValue`.
    pub fn display_name(&self) -> &'static str {
        self.display_name
    }

    pub fn lower_name(&self) -> &str {
        &self.lower_name
    }

    /// `<lowercased name>_v<version>`.
    pub fn canonical_name(&self) -> &str {
        &self.canonical_name
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    /// Content hash of the canonical name.
    pub fn id(&self) -> i64 {
        self.id
    }

    /// Decodes raw payload bytes.
    ///
    /// Empty input and decoder panics are reported as errors.
    pub fn decode(&self, data: &[u8]) -> Result<Box<dyn Payload>, SerializationError> {
        if data.is_empty() {
            return Err(SerializationError::new(format!(
                "empty payload for {}",
                self.canonical_name
            )));
        }
        match catch_unwind(AssertUnwindSafe(|| (self.decoder)(data))) {
            Ok(result) => result,
            Err(_) => Err(SerializationError::new(format!(
                "decoder panicked for {}",
                self.canonical_name
            ))),
        }
    }

    /// Decodes the payload carried by `message`.
    pub fn extract(&self, message: &Message) -> Result<Box<dyn Payload>, SerializationError> {
        if message.message_type() != self.message_type_id {
            return Err(SerializationError::new(format!(
                "message type {} is not {}",
                message.message_type(),
                self.canonical_name
            )));
        }
        self.decode(message.data())
    }

    fn matches(&self, payload: &dyn Payload) -> bool {
        normalize_uri(payload.domain_uri()) == *self.domain_uri
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} v{} type[{}] id[{:X}]",
            if self.is_command { 'C' } else { 'E' },
            self.display_name,
            self.version,
            self.message_type_id,
            self.id as u64
        )
    }
}

/// All message types of one domain, commands first then by canonical name.
#[derive(Debug, Clone, Default)]
pub struct MessageTypeCatalog {
    entries: Vec<MessageType>,
    command_count: usize,
    by_name: HashMap<&'static str, usize>,
    by_id: HashMap<MessageTypeId, usize>,
}

impl MessageTypeCatalog {
    pub(crate) fn new(mut entries: Vec<MessageType>) -> Self {
        entries.sort_by(|a, b| {
            b.is_command
                .cmp(&a.is_command)
                .then_with(|| a.canonical_name.cmp(&b.canonical_name))
        });
        let command_count = entries.iter().filter(|m| m.is_command).count();
        let by_name = entries
            .iter()
            .enumerate()
            .map(|(i, m)| (m.display_name, i))
            .collect();
        let by_id = entries
            .iter()
            .enumerate()
            .map(|(i, m)| (m.message_type_id, i))
            .collect();

        Self {
            entries,
            command_count,
            by_name,
            by_id,
        }
    }

    /// Returns every entry in catalog order.
    pub fn all(&self) -> &[MessageType] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn by_id(&self, id: MessageTypeId) -> Option<&MessageType> {
        self.by_id.get(&id).map(|&i| &self.entries[i])
    }

    /// Finds the entry describing the runtime type of `payload`.
    pub fn by_instance(&self, payload: &dyn Payload) -> Option<&MessageType> {
        self.by_name
            .get(payload.message_name())
            .map(|&i| &self.entries[i])
            .filter(|m| m.matches(payload))
    }

    /// Finds an entry by display name.
    pub fn by_name(&self, name: &str) -> Option<&MessageType> {
        self.by_name.get(name).map(|&i| &self.entries[i])
    }

    pub fn by_type<T: MessageDefinition>(&self) -> Option<&MessageType> {
        self.by_name
            .get(T::name())
            .map(|&i| &self.entries[i])
            .filter(|m| normalize_uri(T::DOMAIN_URI) == *m.domain_uri)
    }

    /// View restricted to commands.
    pub fn commands(&self) -> CatalogView<'_> {
        CatalogView {
            catalog: self,
            commands: true,
        }
    }

    /// View restricted to events.
    pub fn events(&self) -> CatalogView<'_> {
        CatalogView {
            catalog: self,
            commands: false,
        }
    }
}

/// One partition (commands or events) of a [`MessageTypeCatalog`].
#[derive(Debug, Clone, Copy)]
pub struct CatalogView<'a> {
    catalog: &'a MessageTypeCatalog,
    commands: bool,
}

impl<'a> CatalogView<'a> {
    pub fn all(&self) -> &'a [MessageType] {
        let (commands, events) = self.catalog.entries.split_at(self.catalog.command_count);
        if self.commands { commands } else { events }
    }

    pub fn len(&self) -> usize {
        self.all().len()
    }

    pub fn is_empty(&self) -> bool {
        self.all().is_empty()
    }

    pub fn by_id(&self, id: MessageTypeId) -> Option<&'a MessageType> {
        self.keep(self.catalog.by_id(id))
    }

    pub fn by_instance(&self, payload: &dyn Payload) -> Option<&'a MessageType> {
        self.keep(self.catalog.by_instance(payload))
    }

    pub fn by_type<T: MessageDefinition>(&self) -> Option<&'a MessageType> {
        self.keep(self.catalog.by_type::<T>())
    }

    fn keep(&self, found: Option<&'a MessageType>) -> Option<&'a MessageType> {
        found.filter(|m| m.is_command == self.commands)
    }
}
