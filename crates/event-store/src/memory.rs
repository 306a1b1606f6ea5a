use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use common::{AggregateBodyData, AggregateHeader, content_hash};
use domain::{DomainRegistry, Message, Payload};
use tokio::sync::RwLock;
use tracing::debug;

use crate::{
    EventStoreError, Result,
    store::{EventStoreReader, EventStoreWriter},
};

type AggregateKey = (i32, i64);

#[derive(Default)]
struct Inner {
    streams: HashMap<AggregateKey, Vec<Message>>,
    keys: HashMap<AggregateKey, String>,
    snapshots: HashMap<AggregateKey, AggregateBodyData>,
}

impl Inner {
    fn current_version(&self, key: &AggregateKey) -> i32 {
        self.streams
            .get(key)
            .and_then(|events| events.last())
            .map(|e| e.version())
            .unwrap_or(0)
    }
}

/// In-memory event store.
///
/// Builds envelopes through the shared [`DomainRegistry`], so every stored
/// message carries the registry's source id. Appends check the expected
/// version under one write lock, which gives the atomic
/// "append if version matches" guarantee the command pipeline relies on.
#[derive(Clone)]
pub struct InMemoryEventStore {
    registry: Arc<DomainRegistry>,
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryEventStore {
    /// Creates a new empty in-memory event store.
    pub fn new(registry: Arc<DomainRegistry>) -> Self {
        Self {
            registry,
            inner: Arc::new(RwLock::new(Inner::default())),
        }
    }

    /// Returns the total number of events stored.
    pub async fn event_count(&self) -> usize {
        self.inner.read().await.streams.values().map(Vec::len).sum()
    }

    /// Clears all events, keys and snapshots.
    pub async fn clear(&self) {
        let mut inner = self.inner.write().await;
        inner.streams.clear();
        inner.keys.clear();
        inner.snapshots.clear();
    }

    fn now() -> i64 {
        Utc::now().timestamp_nanos_opt().unwrap_or_default()
    }

    fn domain_id_of(&self, payload: &dyn Payload) -> Result<i32> {
        let domain = self
            .registry
            .domain_of(payload)
            .ok_or_else(|| EventStoreError::UnknownDomain(payload.domain_uri().to_string()))?;
        match domain.message_type(payload) {
            Some(m) if m.is_command() => Err(EventStoreError::NotAnEvent(m.canonical_name().to_string())),
            Some(_) => Ok(domain.short_id()),
            None => Err(EventStoreError::UnknownMessageType {
                domain: domain.uri().to_string(),
                name: payload.message_name().to_string(),
            }),
        }
    }

    fn append_locked(
        &self,
        inner: &mut Inner,
        key: AggregateKey,
        version: i32,
        origin: &[AggregateBodyData],
        payload: &dyn Payload,
    ) -> Result<Message> {
        let actual = inner.current_version(&key);
        if actual != version - 1 {
            return Err(EventStoreError::ConcurrencyConflict {
                domain_id: key.0,
                id: key.1,
                expected: version - 1,
                actual,
            });
        }

        let message = self
            .registry
            .new_message(key.1, version, Self::now(), origin, payload)?;
        inner.streams.entry(key).or_default().push(message.clone());

        metrics::counter!("event_store_appends_total").increment(1);
        debug!(
            domain_id = key.0,
            id = key.1,
            version,
            event = payload.message_name(),
            "Event appended"
        );
        Ok(message)
    }
}

fn in_period(message: &Message, min_ts: i64, max_ts: i64) -> bool {
    (min_ts..=max_ts).contains(&message.timestamp())
}

#[async_trait]
impl EventStoreReader for InMemoryEventStore {
    async fn get_snapshot(&self, domain_id: i32, id: i64) -> Result<Option<AggregateBodyData>> {
        let inner = self.inner.read().await;
        Ok(inner.snapshots.get(&(domain_id, id)).cloned())
    }

    async fn get_event(&self, domain_id: i32, id: i64, version: i32) -> Result<Option<Message>> {
        let inner = self.inner.read().await;
        Ok(inner
            .streams
            .get(&(domain_id, id))
            .and_then(|events| events.iter().find(|e| e.version() == version))
            .cloned())
    }

    async fn get_domain_events(
        &self,
        domain_id: i32,
        min_ts: i64,
        max_ts: i64,
    ) -> Result<Vec<Message>> {
        let inner = self.inner.read().await;
        let mut events: Vec<_> = inner
            .streams
            .iter()
            .filter(|((domain, _), _)| *domain == domain_id)
            .flat_map(|(_, events)| events.iter())
            .filter(|e| in_period(e, min_ts, max_ts))
            .cloned()
            .collect();

        events.sort_by(|a, b| {
            a.timestamp()
                .cmp(&b.timestamp())
                .then(a.id().cmp(&b.id()))
                .then(a.version().cmp(&b.version()))
        });
        Ok(events)
    }

    async fn get_aggregate_events(
        &self,
        domain_id: i32,
        id: i64,
        min_version: i32,
    ) -> Result<Vec<Message>> {
        let inner = self.inner.read().await;
        Ok(inner
            .streams
            .get(&(domain_id, id))
            .map(|events| {
                events
                    .iter()
                    .filter(|e| e.version() >= min_version)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn get_aggregate_events_by_period(
        &self,
        domain_id: i32,
        id: i64,
        min_ts: i64,
        max_ts: i64,
    ) -> Result<Vec<Message>> {
        let inner = self.inner.read().await;
        Ok(inner
            .streams
            .get(&(domain_id, id))
            .map(|events| {
                events
                    .iter()
                    .filter(|e| in_period(e, min_ts, max_ts))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn get_aggregate_events_with_snapshot(
        &self,
        domain_id: i32,
        id: i64,
    ) -> Result<(Vec<Message>, Option<AggregateBodyData>)> {
        let snapshot = self.get_snapshot(domain_id, id).await?;
        let from = snapshot.as_ref().map(|s| s.version() + 1).unwrap_or(0);
        let events = self.get_aggregate_events(domain_id, id, from).await?;
        Ok((events, snapshot))
    }

    async fn get_keyed_aggregate_events(
        &self,
        domain_id: i32,
        key: &str,
        min_version: i32,
    ) -> Result<Vec<Message>> {
        if key.is_empty() {
            return Err(EventStoreError::InvalidEventKey(key.to_string()));
        }
        let id = content_hash(key.as_bytes());
        {
            let inner = self.inner.read().await;
            if let Some(existing) = inner.keys.get(&(domain_id, id))
                && existing != key
            {
                return Err(EventStoreError::KeyCollision {
                    key: key.to_string(),
                    existing: existing.clone(),
                });
            }
        }
        self.get_aggregate_events(domain_id, id, min_version).await
    }
}

#[async_trait]
impl EventStoreWriter for InMemoryEventStore {
    async fn store_snapshot(&self, snapshot: AggregateBodyData) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner
            .snapshots
            .insert((snapshot.domain_id(), snapshot.id()), snapshot);
        Ok(())
    }

    async fn append_event(
        &self,
        id: i64,
        version: i32,
        origin: &[AggregateBodyData],
        payload: &dyn Payload,
    ) -> Result<Message> {
        let domain_id = self.domain_id_of(payload)?;
        let mut inner = self.inner.write().await;
        self.append_locked(&mut inner, (domain_id, id), version, origin, payload)
    }

    async fn append_keyed_event(
        &self,
        key: &str,
        origin: &[AggregateBodyData],
        payload: &dyn Payload,
    ) -> Result<Message> {
        if key.is_empty() {
            return Err(EventStoreError::InvalidEventKey(key.to_string()));
        }
        let domain_id = self.domain_id_of(payload)?;
        let aggregate = (domain_id, content_hash(key.as_bytes()));

        let mut inner = self.inner.write().await;
        if let Some(existing) = inner.keys.get(&aggregate)
            && existing != key
        {
            return Err(EventStoreError::KeyCollision {
                key: key.to_string(),
                existing: existing.clone(),
            });
        }

        let version = inner.current_version(&aggregate) + 1;
        let message = self.append_locked(&mut inner, aggregate, version, origin, payload)?;
        inner.keys.entry(aggregate).or_insert_with(|| key.to_string());
        Ok(message)
    }

    async fn delete_event(&self, domain_id: i32, id: i64, version: i32) -> Result<bool> {
        let mut inner = self.inner.write().await;
        let Some(events) = inner.streams.get_mut(&(domain_id, id)) else {
            return Ok(false);
        };
        let before = events.len();
        events.retain(|e| e.version() != version);
        Ok(events.len() < before)
    }

    async fn delete_aggregate(&self, domain_id: i32, id: i64) -> Result<usize> {
        let mut inner = self.inner.write().await;
        let key = (domain_id, id);
        inner.snapshots.remove(&key);
        inner.keys.remove(&key);
        Ok(inner.streams.remove(&key).map(|events| events.len()).unwrap_or(0))
    }
}
