use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use agentflow_core::A2AEvent;
use tokio::sync::mpsc;
use tracing::trace;
use uuid::Uuid;

const DEFAULT_SUBSCRIBER_BUFFER: usize = 100;

struct Subscriber {
    id: Uuid,
    tx: mpsc::Sender<A2AEvent>,
}

#[derive(Default)]
struct Inner {
    subscribers: RwLock<HashMap<String, Vec<Subscriber>>>,
}

/// Per-task publish/subscribe fan-out (spec §4.5). `publish` never blocks:
/// a subscriber whose buffer is full simply drops the event rather than
/// slowing the producer down. Reads (`publish`) and writes
/// (`subscribe`/`unsubscribe`) share one `RwLock`, matching the provider
/// registry's concurrency discipline (spec §5).
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Arc<Inner>,
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver `event` to every current subscriber of `event.task_id`.
    /// Bounded time regardless of drain rate (testable property 6): each
    /// send is a non-blocking `try_send`.
    pub fn publish(&self, event: A2AEvent) {
        let subscribers = self.inner.subscribers.read().unwrap_or_else(|e| e.into_inner());
        let Some(subs) = subscribers.get(&event.task_id) else {
            return;
        };
        for sub in subs {
            if sub.tx.try_send(event.clone()).is_err() {
                trace!(task_id = %event.task_id, subscriber = %sub.id, "dropping event: subscriber buffer full or closed");
            }
        }
    }

    /// Subscribe to events for `task_id`. The returned subscription
    /// removes itself from the bus on drop.
    #[must_use]
    pub fn subscribe(&self, task_id: impl Into<String>) -> EventSubscription {
        self.subscribe_with_capacity(task_id, DEFAULT_SUBSCRIBER_BUFFER)
    }

    #[must_use]
    pub fn subscribe_with_capacity(&self, task_id: impl Into<String>, capacity: usize) -> EventSubscription {
        let task_id = task_id.into();
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::channel(capacity.max(1));

        let mut subscribers = self.inner.subscribers.write().unwrap_or_else(|e| e.into_inner());
        subscribers.entry(task_id.clone()).or_default().push(Subscriber { id, tx });

        EventSubscription {
            task_id,
            id,
            rx,
            bus: self.clone(),
        }
    }

    fn unsubscribe(&self, task_id: &str, id: Uuid) {
        let mut subscribers = self.inner.subscribers.write().unwrap_or_else(|e| e.into_inner());
        if let Some(subs) = subscribers.get_mut(task_id) {
            subs.retain(|s| s.id != id);
            if subs.is_empty() {
                subscribers.remove(task_id);
            }
        }
    }

    #[must_use]
    pub fn subscriber_count(&self, task_id: &str) -> usize {
        self.inner
            .subscribers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(task_id)
            .map_or(0, Vec::len)
    }
}

/// A live subscription to one task's events. Dropping it unsubscribes.
pub struct EventSubscription {
    task_id: String,
    id: Uuid,
    rx: mpsc::Receiver<A2AEvent>,
    bus: EventBus,
}

impl EventSubscription {
    pub async fn recv(&mut self) -> Option<A2AEvent> {
        self.rx.recv().await
    }

    #[must_use]
    pub fn task_id(&self) -> &str {
        &self.task_id
    }
}

impl Drop for EventSubscription {
    fn drop(&mut self) {
        self.bus.unsubscribe(&self.task_id, self.id);
    }
}
