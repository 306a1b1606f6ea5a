use std::sync::Arc;

use common::AggregateHeader;
use criterion::{Criterion, criterion_group, criterion_main};
use domain::{DomainRegistry, ErrorRaised};
use event_store::{EventStoreReader, EventStoreWriter, InMemoryEventStore};

fn store() -> InMemoryEventStore {
    InMemoryEventStore::new(Arc::new(
        DomainRegistry::builder("bench/source").build().unwrap(),
    ))
}

fn event() -> ErrorRaised {
    ErrorRaised {
        message: "bench".to_string(),
    }
}

fn bench_append_event(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("event_store/append_event", |b| {
        b.iter(|| {
            rt.block_on(async {
                let store = store();
                store.append_event(1, 1, &[], &event()).await.unwrap();
            });
        });
    });
}

fn bench_append_keyed_event(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("event_store/append_keyed_event", |b| {
        b.iter(|| {
            rt.block_on(async {
                let store = store();
                store.append_keyed_event("bench", &[], &event()).await.unwrap();
            });
        });
    });
}

fn bench_load_100_events(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = store();
    let domain_id = rt.block_on(async {
        let mut domain_id = 0;
        for version in 1..=100 {
            let message = store.append_event(7, version, &[], &event()).await.unwrap();
            domain_id = message.domain_id();
        }
        domain_id
    });

    c.bench_function("event_store/load_100_events", |b| {
        b.iter(|| {
            rt.block_on(async {
                store.get_aggregate_events(domain_id, 7, 0).await.unwrap();
            });
        });
    });
}

criterion_group!(
    benches,
    bench_append_event,
    bench_append_keyed_event,
    bench_load_100_events
);
criterion_main!(benches);
