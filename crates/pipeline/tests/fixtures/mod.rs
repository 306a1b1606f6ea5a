//! Shared test domains, handlers and a store with injectable failures.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use common::{AggregateBodyData, AggregateHeaderData};
use domain::{
    Aggregate, DomainDefinition, DomainRegistry, Message, MessageDefinition, MessageGroup, Payload,
};
use event_store::{
    EventStoreError, EventStoreReader, EventStoreWriter, InMemoryEventStore, Result,
};
use pipeline::{
    CommandContext, Dependencies, HandlerRegistry, RecordingPublisher, Service, ServiceContext,
    Subscription,
};
use serde::{Deserialize, Serialize};

pub const VALUE_URI: &str = "github.com/acme/domains/valuechanger/v1";
pub const ACCOUNT_URI: &str = "github.com/acme/domains/accounts/v1";
pub const SOURCE: &str = "test/source";

// valuechanger

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetValue {
    pub value: String,
}

impl MessageDefinition for SetValue {
    const DOMAIN_URI: &'static str = VALUE_URI;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetTwice {
    pub first: String,
    pub second: String,
}

impl MessageDefinition for SetTwice {
    const DOMAIN_URI: &'static str = VALUE_URI;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoNothing {}

impl MessageDefinition for DoNothing {
    const DOMAIN_URI: &'static str = VALUE_URI;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Explode {}

impl MessageDefinition for Explode {
    const DOMAIN_URI: &'static str = VALUE_URI;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueSet {
    pub value: String,
    pub previous: String,
    pub seen_version: i32,
}

impl MessageDefinition for ValueSet {
    const DOMAIN_URI: &'static str = VALUE_URI;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Value {
    pub value: String,
}

impl Aggregate for Value {
    fn apply(&mut self, event: &dyn Payload) {
        if let Some(set) = event.downcast_ref::<ValueSet>() {
            self.value = set.value.clone();
        }
    }
}

pub fn value_handler(
    ctx: &mut CommandContext,
    header: &AggregateHeaderData,
    state: &Value,
    _command: &Message,
    payload: &dyn Payload,
) {
    let set = |value: &str| ValueSet {
        value: value.to_string(),
        previous: state.value.clone(),
        seen_version: header.version,
    };

    if let Some(command) = payload.downcast_ref::<SetValue>() {
        ctx.assert(!command.value.is_empty(), "value required");
        ctx.publish(set(&command.value));
    } else if let Some(command) = payload.downcast_ref::<SetTwice>() {
        ctx.publish(set(&command.first));
        ctx.publish(set(&command.second));
    } else if payload.is::<Explode>() {
        panic!("boom");
    }
}

// accounts (keyed)

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenAccount {
    pub username: String,
}

impl MessageDefinition for OpenAccount {
    const DOMAIN_URI: &'static str = ACCOUNT_URI;

    fn aggregate_key(&self) -> Option<&str> {
        Some(&self.username)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountOpened {
    pub username: String,
}

impl MessageDefinition for AccountOpened {
    const DOMAIN_URI: &'static str = ACCOUNT_URI;

    fn aggregate_key(&self) -> Option<&str> {
        Some(&self.username)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub opened: bool,
}

impl Aggregate for Account {
    fn apply(&mut self, event: &dyn Payload) {
        if event.is::<AccountOpened>() {
            self.opened = true;
        }
    }
}

pub fn account_handler(
    ctx: &mut CommandContext,
    _header: &AggregateHeaderData,
    state: &Account,
    _command: &Message,
    payload: &dyn Payload,
) {
    if let Some(open) = payload.downcast_ref::<OpenAccount>() {
        ctx.assert(!state.opened, "already open");
        ctx.publish(AccountOpened {
            username: open.username.clone(),
        });
    }
}

/// Opens an account for `ValueSet("notify:<name>")` and reports an error
/// for `ValueSet("fail")`.
pub struct Notifier;

#[async_trait]
impl Service for Notifier {
    fn name(&self) -> &str {
        "notifier"
    }

    fn domain_uri(&self) -> &str {
        ACCOUNT_URI
    }

    fn subscriptions(&self) -> Vec<Subscription> {
        vec![Subscription::to::<ValueSet>()]
    }

    async fn handle(&self, ctx: &mut ServiceContext<'_>, _event: &Message, payload: &dyn Payload) {
        let Some(set) = payload.downcast_ref::<ValueSet>() else {
            return;
        };
        if let Some(username) = set.value.strip_prefix("notify:") {
            let opened = ctx
                .publish(
                    OpenAccount {
                        username: username.to_string(),
                    },
                    Vec::new(),
                )
                .await;
            assert!(opened.is_ok());
        } else if set.value == "fail" {
            let raised = ctx.error("service failure").await;
            assert!(raised.is_ok());
        }
    }
}

pub fn registry() -> Arc<DomainRegistry> {
    let values = DomainDefinition::new(VALUE_URI)
        .aggregate::<Value>()
        .commands(
            MessageGroup::commands()
                .message::<SetValue>()
                .message::<SetTwice>()
                .message::<DoNothing>()
                .message::<Explode>(),
        )
        .events(MessageGroup::events().message::<ValueSet>())
        .must_compile();
    let accounts = DomainDefinition::new(ACCOUNT_URI)
        .aggregate::<Account>()
        .commands(MessageGroup::commands().message::<OpenAccount>())
        .events(MessageGroup::events().message::<AccountOpened>())
        .must_compile();

    Arc::new(
        DomainRegistry::builder(SOURCE)
            .register(values)
            .register(accounts)
            .build()
            .unwrap(),
    )
}

pub fn handlers(registry: &Arc<DomainRegistry>) -> HandlerRegistry {
    HandlerRegistry::builder(Arc::clone(registry))
        .command_handler::<Value, _>(VALUE_URI, value_handler)
        .command_handler::<Account, _>(ACCOUNT_URI, account_handler)
        .service(Notifier)
        .build()
        .unwrap()
}

/// Event store that fails a configurable number of upcoming calls, or
/// returns aggregate histories with unreadable payloads.
pub struct FlakyStore {
    pub inner: InMemoryEventStore,
    failing_reads: AtomicUsize,
    failing_appends: AtomicUsize,
    garbled_reads: AtomicBool,
}

impl FlakyStore {
    pub fn new(registry: Arc<DomainRegistry>) -> Self {
        Self {
            inner: InMemoryEventStore::new(registry),
            failing_reads: AtomicUsize::new(0),
            failing_appends: AtomicUsize::new(0),
            garbled_reads: AtomicBool::new(false),
        }
    }

    pub fn fail_reads(&self, count: usize) {
        self.failing_reads.store(count, Ordering::SeqCst);
    }

    pub fn fail_appends(&self, count: usize) {
        self.failing_appends.store(count, Ordering::SeqCst);
    }

    /// Replaces the payload of every event in returned histories.
    pub fn garble_reads(&self, garbled: bool) {
        self.garbled_reads.store(garbled, Ordering::SeqCst);
    }

    fn history(&self, events: Vec<Message>) -> Vec<Message> {
        if !self.garbled_reads.load(Ordering::SeqCst) {
            return events;
        }
        events.iter().map(|e| with_data(e, b"garbage")).collect()
    }

    fn take(counter: &AtomicUsize) -> Result<()> {
        let taken = counter.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        match taken {
            Ok(_) => Err(EventStoreError::Unavailable("injected failure".to_string())),
            Err(_) => Ok(()),
        }
    }
}

#[async_trait]
impl EventStoreReader for FlakyStore {
    async fn get_snapshot(&self, domain_id: i32, id: i64) -> Result<Option<AggregateBodyData>> {
        self.inner.get_snapshot(domain_id, id).await
    }

    async fn get_event(&self, domain_id: i32, id: i64, version: i32) -> Result<Option<Message>> {
        self.inner.get_event(domain_id, id, version).await
    }

    async fn get_domain_events(
        &self,
        domain_id: i32,
        min_ts: i64,
        max_ts: i64,
    ) -> Result<Vec<Message>> {
        self.inner.get_domain_events(domain_id, min_ts, max_ts).await
    }

    async fn get_aggregate_events(
        &self,
        domain_id: i32,
        id: i64,
        min_version: i32,
    ) -> Result<Vec<Message>> {
        Self::take(&self.failing_reads)?;
        let events = self.inner.get_aggregate_events(domain_id, id, min_version).await?;
        Ok(self.history(events))
    }

    async fn get_aggregate_events_by_period(
        &self,
        domain_id: i32,
        id: i64,
        min_ts: i64,
        max_ts: i64,
    ) -> Result<Vec<Message>> {
        self.inner
            .get_aggregate_events_by_period(domain_id, id, min_ts, max_ts)
            .await
    }

    async fn get_aggregate_events_with_snapshot(
        &self,
        domain_id: i32,
        id: i64,
    ) -> Result<(Vec<Message>, Option<AggregateBodyData>)> {
        self.inner.get_aggregate_events_with_snapshot(domain_id, id).await
    }

    async fn get_keyed_aggregate_events(
        &self,
        domain_id: i32,
        key: &str,
        min_version: i32,
    ) -> Result<Vec<Message>> {
        Self::take(&self.failing_reads)?;
        let events = self
            .inner
            .get_keyed_aggregate_events(domain_id, key, min_version)
            .await?;
        Ok(self.history(events))
    }
}

#[async_trait]
impl EventStoreWriter for FlakyStore {
    async fn store_snapshot(&self, snapshot: AggregateBodyData) -> Result<()> {
        self.inner.store_snapshot(snapshot).await
    }

    async fn append_event(
        &self,
        id: i64,
        version: i32,
        origin: &[AggregateBodyData],
        payload: &dyn Payload,
    ) -> Result<Message> {
        Self::take(&self.failing_appends)?;
        self.inner.append_event(id, version, origin, payload).await
    }

    async fn append_keyed_event(
        &self,
        key: &str,
        origin: &[AggregateBodyData],
        payload: &dyn Payload,
    ) -> Result<Message> {
        Self::take(&self.failing_appends)?;
        self.inner.append_keyed_event(key, origin, payload).await
    }

    async fn delete_event(&self, domain_id: i32, id: i64, version: i32) -> Result<bool> {
        self.inner.delete_event(domain_id, id, version).await
    }

    async fn delete_aggregate(&self, domain_id: i32, id: i64) -> Result<usize> {
        self.inner.delete_aggregate(domain_id, id).await
    }
}

pub struct Harness {
    pub registry: Arc<DomainRegistry>,
    pub store: Arc<FlakyStore>,
    pub publisher: RecordingPublisher,
    pub deps: Dependencies,
}

impl Harness {
    pub fn new() -> Self {
        let registry = registry();
        let store = Arc::new(FlakyStore::new(Arc::clone(&registry)));
        let publisher = RecordingPublisher::new();
        let deps = Dependencies::new(Arc::clone(&registry), handlers(&registry), store.clone())
            .with_publisher(publisher.clone());
        Self {
            registry,
            store,
            publisher,
            deps,
        }
    }

    /// Builds a command addressed to aggregate `id`.
    pub fn command(&self, id: i64, payload: &dyn Payload) -> Message {
        self.registry.new_message(id, 1, 0, &[], payload).unwrap()
    }

    pub fn domain_id(&self, uri: &str) -> i32 {
        self.registry.domain_by_uri(uri).unwrap().short_id()
    }
}

pub fn set_value(value: &str) -> SetValue {
    SetValue {
        value: value.to_string(),
    }
}

/// Copy of `message` carrying `data` as its payload bytes.
pub fn with_data(message: &Message, data: &[u8]) -> Message {
    let mut raw = serde_json::to_value(message).unwrap();
    raw["_data"] = serde_json::json!(data);
    serde_json::from_value(raw).unwrap()
}

/// Message of an `ErrorRaised` event, if `message` is one.
pub fn error_text(message: &Message) -> Option<String> {
    message
        .extract::<domain::ErrorRaised>()
        .ok()
        .map(|e| e.message)
}
