//! Registry of compiled domains for one source.

use std::collections::HashMap;
use std::sync::Arc;

use common::{AggregateBodyData, content_hash};
use tracing::info;

use crate::compiler::normalize_uri;
use crate::domain::Domain;
use crate::error::{MessageError, RegistryError};
use crate::message::Message;
use crate::payload::Payload;
use crate::system::{SYSTEM_DOMAIN_URI, system_domain};

/// The domains known to one source (system of record).
///
/// Domains are addressed by their short id, the value carried in every
/// aggregate header, and by URI.
#[derive(Debug)]
pub struct DomainRegistry {
    source_uri: String,
    source_id: i64,
    domains: HashMap<i32, Arc<Domain>>,
    by_uri: HashMap<String, i32>,
}

impl DomainRegistry {
    /// Starts a registry for `source_uri`. The system domain is always included.
    pub fn builder(source_uri: impl Into<String>) -> DomainRegistryBuilder {
        DomainRegistryBuilder {
            source_uri: source_uri.into(),
            domains: Vec::new(),
        }
    }

    pub fn source_uri(&self) -> &str {
        &self.source_uri
    }

    /// Content hash of the source URI.
    pub fn source_id(&self) -> i64 {
        self.source_id
    }

    pub fn domain(&self, short_id: i32) -> Option<&Arc<Domain>> {
        self.domains.get(&short_id)
    }

    pub fn domain_by_uri(&self, uri: &str) -> Option<&Arc<Domain>> {
        self.by_uri
            .get(normalize_uri(uri).as_ref())
            .and_then(|id| self.domains.get(id))
    }

    /// Domain owning the runtime type of `payload`.
    pub fn domain_of(&self, payload: &dyn Payload) -> Option<&Arc<Domain>> {
        self.domain_by_uri(payload.domain_uri())
    }

    pub fn system(&self) -> Option<&Arc<Domain>> {
        self.domain_by_uri(SYSTEM_DOMAIN_URI)
    }

    pub fn domains(&self) -> impl Iterator<Item = &Arc<Domain>> {
        self.domains.values()
    }

    /// Builds an envelope for `payload` from this source.
    pub fn new_message(
        &self,
        id: i64,
        version: i32,
        timestamp: i64,
        origins: &[AggregateBodyData],
        payload: &dyn Payload,
    ) -> Result<Message, MessageError> {
        let domain = self
            .domain_of(payload)
            .ok_or_else(|| MessageError::UnknownDomain(payload.domain_uri().to_string()))?;
        Message::new(self.source_id, domain, id, version, timestamp, origins, payload)
    }
}

pub struct DomainRegistryBuilder {
    source_uri: String,
    domains: Vec<Domain>,
}

impl DomainRegistryBuilder {
    pub fn register(mut self, domain: Domain) -> Self {
        self.domains.push(domain);
        self
    }

    pub fn build(self) -> Result<DomainRegistry, RegistryError> {
        let mut registry = DomainRegistry {
            source_id: content_hash(self.source_uri.as_bytes()),
            source_uri: self.source_uri,
            domains: HashMap::new(),
            by_uri: HashMap::new(),
        };

        for domain in std::iter::once(system_domain()?).chain(self.domains) {
            let short_id = domain.short_id();
            if registry.domains.contains_key(&short_id) || registry.by_uri.contains_key(domain.uri()) {
                return Err(RegistryError::DuplicateDomain(domain.uri().to_string()));
            }
            registry.by_uri.insert(domain.uri().to_string(), short_id);
            registry.domains.insert(short_id, Arc::new(domain));
        }

        info!(
            source = %registry.source_uri,
            domains = registry.domains.len(),
            "Domain registry built"
        );
        Ok(registry)
    }
}
