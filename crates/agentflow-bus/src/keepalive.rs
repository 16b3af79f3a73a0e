use std::time::Duration;

use agentflow_core::A2AEvent;
use serde_json::json;
use tokio::time::{Interval, MissedTickBehavior};

use crate::bus::EventSubscription;

/// How long an SSE consumer (spec §4.6) can go without a real event
/// before a synthetic keep-alive is injected to hold the connection
/// open through intermediate proxies.
const DEFAULT_KEEPALIVE_INTERVAL: Duration = Duration::from_secs(30);

/// Wraps an `EventSubscription` and injects a synthetic `status_update`
/// event after `DEFAULT_KEEPALIVE_INTERVAL` of silence, so A2A streaming
/// handlers never sit on a socket with nothing flowing. The idle timer
/// resets on every real event forwarded; the stream ends, like the
/// subscription it wraps, once the bus closes it or the caller drops it.
pub struct KeepAliveStream {
    inner: EventSubscription,
    interval: Interval,
}

impl KeepAliveStream {
    #[must_use]
    pub fn new(inner: EventSubscription) -> Self {
        Self::with_interval(inner, DEFAULT_KEEPALIVE_INTERVAL)
    }

    #[must_use]
    pub fn with_interval(inner: EventSubscription, keepalive: Duration) -> Self {
        let mut interval = tokio::time::interval(keepalive);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick fires immediately; consume it so the idle clock
        // actually starts at `keepalive`, not at zero.
        interval.reset();
        Self { inner, interval }
    }

    #[must_use]
    pub fn task_id(&self) -> &str {
        self.inner.task_id()
    }

    /// Next event, real or synthetic. `None` once the underlying
    /// subscription closes for good (bus dropped, or unsubscribed).
    pub async fn recv(&mut self) -> Option<A2AEvent> {
        tokio::select! {
            biased;
            event = self.inner.recv() => {
                if event.is_some() {
                    self.interval.reset();
                }
                event
            }
            _ = self.interval.tick() => {
                Some(A2AEvent::status_update(self.task_id(), json!({"keepalive": true})))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::EventBus;

    #[tokio::test]
    async fn forwards_real_events_untouched() {
        let bus = EventBus::new();
        let mut stream = KeepAliveStream::with_interval(bus.subscribe("t1"), Duration::from_secs(60));
        bus.publish(A2AEvent::status_update("t1", json!(1)));
        let event = stream.recv().await.unwrap();
        assert_eq!(event.data, json!(1));
    }

    #[tokio::test]
    async fn injects_keepalive_after_silence() {
        let bus = EventBus::new();
        let mut stream = KeepAliveStream::with_interval(bus.subscribe("t1"), Duration::from_millis(20));
        let event = stream.recv().await.unwrap();
        assert_eq!(event.data, json!({"keepalive": true}));
    }

    #[tokio::test]
    async fn dropping_the_stream_unsubscribes_from_the_bus() {
        let bus = EventBus::new();
        let stream = KeepAliveStream::with_interval(bus.subscribe("t1"), Duration::from_secs(60));
        assert_eq!(bus.subscriber_count("t1"), 1);
        drop(stream);
        assert_eq!(bus.subscriber_count("t1"), 0);
    }
}
