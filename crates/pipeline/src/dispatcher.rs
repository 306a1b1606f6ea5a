//! Delivery of appended events to subscribed services.

use std::sync::Arc;

use domain::Message;
use tokio::sync::mpsc;
use tracing::info;

use crate::deps::Dependencies;
use crate::service::handle_event;

/// Drains a [`ChannelPublisher`](crate::ChannelPublisher) channel and runs
/// every subscribed service on each event, one event at a time.
pub struct EventDispatcher {
    deps: Arc<Dependencies>,
    receiver: mpsc::UnboundedReceiver<Message>,
}

impl EventDispatcher {
    pub fn new(deps: Arc<Dependencies>, receiver: mpsc::UnboundedReceiver<Message>) -> Self {
        Self { deps, receiver }
    }

    /// Runs the subscribers of `event`; returns how many ran.
    pub async fn dispatch(&self, event: &Message) -> usize {
        if event.is_command() {
            return 0;
        }
        let services = self.deps.handlers.services_for(event);
        for service in &services {
            handle_event(&self.deps, service.as_ref(), event).await;
        }
        services.len()
    }

    /// Dispatches until the channel is empty, including events published
    /// while dispatching. Returns the number of events taken.
    pub async fn drain(&mut self) -> usize {
        let mut count = 0;
        while let Ok(event) = self.receiver.try_recv() {
            self.dispatch(&event).await;
            count += 1;
        }
        count
    }

    /// Dispatches until every sender is dropped.
    #[tracing::instrument(skip(self))]
    pub async fn run(mut self) {
        let mut count: u64 = 0;
        while let Some(event) = self.receiver.recv().await {
            self.dispatch(&event).await;
            count += 1;
        }
        info!(events = count, "Event dispatcher stopped");
    }
}
