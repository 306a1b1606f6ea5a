use async_trait::async_trait;
use common::AggregateBodyData;
use domain::{Message, Payload};

use crate::Result;

/// Read side of an event store.
///
/// Aggregates are addressed by the header domain id (the domain short id)
/// and aggregate id. Event lists are returned in version order.
#[async_trait]
pub trait EventStoreReader: Send + Sync {
    /// Retrieves the latest snapshot record of an aggregate.
    async fn get_snapshot(&self, domain_id: i32, id: i64) -> Result<Option<AggregateBodyData>>;

    /// Retrieves one event by version.
    async fn get_event(&self, domain_id: i32, id: i64, version: i32) -> Result<Option<Message>>;

    /// Retrieves every event of a domain with `min_ts <= timestamp <= max_ts`,
    /// in timestamp order.
    async fn get_domain_events(&self, domain_id: i32, min_ts: i64, max_ts: i64)
    -> Result<Vec<Message>>;

    /// Retrieves an aggregate's events from `min_version` on.
    async fn get_aggregate_events(
        &self,
        domain_id: i32,
        id: i64,
        min_version: i32,
    ) -> Result<Vec<Message>>;

    /// Retrieves an aggregate's events with `min_ts <= timestamp <= max_ts`.
    async fn get_aggregate_events_by_period(
        &self,
        domain_id: i32,
        id: i64,
        min_ts: i64,
        max_ts: i64,
    ) -> Result<Vec<Message>>;

    /// Retrieves the latest snapshot and the events recorded after it.
    ///
    /// Without a snapshot, returns every event.
    async fn get_aggregate_events_with_snapshot(
        &self,
        domain_id: i32,
        id: i64,
    ) -> Result<(Vec<Message>, Option<AggregateBodyData>)>;

    /// Retrieves a keyed aggregate's events from `min_version` on.
    async fn get_keyed_aggregate_events(
        &self,
        domain_id: i32,
        key: &str,
        min_version: i32,
    ) -> Result<Vec<Message>>;
}

/// Write side of an event store.
#[async_trait]
pub trait EventStoreWriter: Send + Sync {
    /// Saves a snapshot record, replacing any previous one.
    async fn store_snapshot(&self, snapshot: AggregateBodyData) -> Result<()>;

    /// Appends an event to an id-based aggregate.
    ///
    /// Fails with `ConcurrencyConflict` unless the aggregate currently holds
    /// exactly `version - 1` events. The domain is resolved from the payload.
    async fn append_event(
        &self,
        id: i64,
        version: i32,
        origin: &[AggregateBodyData],
        payload: &dyn Payload,
    ) -> Result<Message>;

    /// Appends an event to a keyed aggregate at its next version.
    async fn append_keyed_event(
        &self,
        key: &str,
        origin: &[AggregateBodyData],
        payload: &dyn Payload,
    ) -> Result<Message>;

    /// Deletes one event; returns whether it existed.
    async fn delete_event(&self, domain_id: i32, id: i64, version: i32) -> Result<bool>;

    /// Deletes every event and the snapshot of an aggregate; returns the
    /// number of events removed.
    async fn delete_aggregate(&self, domain_id: i32, id: i64) -> Result<usize>;
}

/// A full event store.
pub trait EventStore: EventStoreReader + EventStoreWriter {}

impl<T: EventStoreReader + EventStoreWriter + ?Sized> EventStore for T {}
