//! Broadcast hub.
//!
//! The hub owns every subscriber channel and fans each published event
//! out to all of them:
//!
//! - `publish` assigns the next sequence number and pushes the event into
//!   every registered channel under a single publish lock, so each channel
//!   sees events in sequence order
//! - a full channel drops its oldest item; the publisher never waits on a
//!   reader
//! - `read` is the only suspending operation and only suspends its caller
//! - unknown channel ids are never an error: `read` reports `Closed` and
//!   `unsubscribe` does nothing, since disconnects race with cleanup

mod channel;

pub use channel::{ChannelInfo, ChannelState, Delivery};

use crate::events::{ChannelId, Event, SharedEvent};
use channel::{Next, Pushed, SubscriberChannel};
use parking_lot::{Mutex, RwLock};
use roundtable_sdk::objects::HubStatsResponse;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Default per-channel queue capacity.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Default time a `read` waits before reporting [`ReadOutcome::Idle`].
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(1);

/// Hub settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HubConfig {
    /// Maximum number of unread items per channel.
    pub channel_capacity: usize,
    /// Idle period after which `read` returns so the transport can send a
    /// protocol keep-alive.
    pub read_timeout: Duration,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }
}

/// What a call to [`Hub::read`] produced.
#[derive(Debug, Clone)]
pub enum ReadOutcome {
    Event(SharedEvent),
    /// A keep-alive pushed by the liveness monitor.
    KeepAlive,
    /// Nothing arrived within the read timeout.
    Idle,
    /// The channel was unsubscribed, evicted, or never existed.
    Closed,
}

/// Counter snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HubStats {
    pub published: u64,
    pub dropped: u64,
    pub evicted: u64,
    pub subscribers: usize,
}

impl From<HubStats> for HubStatsResponse {
    fn from(stats: HubStats) -> Self {
        HubStatsResponse {
            published: stats.published,
            dropped: stats.dropped,
            evicted: stats.evicted,
            subscribers: stats.subscribers,
        }
    }
}

/// In-memory broadcast hub. Cheap to clone; clones share all state.
#[derive(Clone)]
pub struct Hub {
    inner: Arc<HubInner>,
}

struct HubInner {
    config: HubConfig,
    channels: RwLock<HashMap<ChannelId, Arc<SubscriberChannel>>>,
    /// Last assigned sequence number. Held for the whole fan-out.
    publish_lock: Mutex<u64>,
    next_channel: AtomicU64,
    dropped: AtomicU64,
    evicted: AtomicU64,
}

impl Hub {
    pub fn new(config: HubConfig) -> Self {
        Self {
            inner: Arc::new(HubInner {
                config,
                channels: RwLock::new(HashMap::new()),
                publish_lock: Mutex::new(0),
                next_channel: AtomicU64::new(1),
                dropped: AtomicU64::new(0),
                evicted: AtomicU64::new(0),
            }),
        }
    }

    pub fn config(&self) -> &HubConfig {
        &self.inner.config
    }

    /// Register a new channel and return its id.
    pub fn subscribe(&self) -> ChannelId {
        let id = ChannelId(self.inner.next_channel.fetch_add(1, Ordering::Relaxed));
        let channel = Arc::new(SubscriberChannel::new(
            id,
            self.inner.config.channel_capacity,
        ));
        let subscribers = {
            let mut channels = self.inner.channels.write();
            channels.insert(id, channel);
            channels.len()
        };
        info!(channel_id = %id, subscribers, "Subscriber registered");
        id
    }

    /// Remove a channel. Returns `false` if it was already gone.
    pub fn unsubscribe(&self, id: ChannelId) -> bool {
        let removed = self.inner.channels.write().remove(&id);
        match removed {
            Some(channel) => {
                channel.close();
                info!(channel_id = %id, "Subscriber removed");
                true
            }
            None => {
                debug!(channel_id = %id, "Unsubscribe for unknown channel ignored");
                false
            }
        }
    }

    /// Publish an event to every registered channel.
    pub fn publish(&self, topic: impl Into<String>, payload: serde_json::Value) -> SharedEvent {
        let topic = topic.into();
        let mut last = self.inner.publish_lock.lock();
        *last += 1;
        let event = Arc::new(Event {
            sequence: *last,
            topic,
            payload,
            timestamp: time::OffsetDateTime::now_utc(),
        });

        let channels = self.inner.channels.read();
        for channel in channels.values() {
            if channel.push(Delivery::Event(Arc::clone(&event))) == Pushed::Overflowed {
                self.inner.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(
                    channel_id = %channel.id(),
                    sequence = event.sequence,
                    "Channel full, dropped oldest item"
                );
            }
        }
        debug!(
            sequence = event.sequence,
            topic = %event.topic,
            receivers = channels.len(),
            "Published event"
        );
        drop(channels);
        drop(last);

        event
    }

    /// Serialize `payload` and publish it.
    pub fn publish_json<T: Serialize>(
        &self,
        topic: impl Into<String>,
        payload: &T,
    ) -> Result<SharedEvent, serde_json::Error> {
        let value = serde_json::to_value(payload)?;
        Ok(self.publish(topic, value))
    }

    /// Wait for the next item on `id`.
    ///
    /// Returns [`ReadOutcome::Idle`] after the configured read timeout and
    /// [`ReadOutcome::Closed`] once the channel is gone.
    pub async fn read(&self, id: ChannelId) -> ReadOutcome {
        let Some(channel) = self.channel(id) else {
            return ReadOutcome::Closed;
        };
        let timeout = self.inner.config.read_timeout;

        loop {
            let notified = channel.notify().notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            match channel.take() {
                Next::Item(Delivery::Event(event)) => return ReadOutcome::Event(event),
                Next::Item(Delivery::KeepAlive) => return ReadOutcome::KeepAlive,
                Next::Closed => return ReadOutcome::Closed,
                Next::Empty => {}
            }

            if tokio::time::timeout(timeout, notified).await.is_err() {
                return ReadOutcome::Idle;
            }
        }
    }

    /// Push a keep-alive into one channel if its queue is empty.
    pub fn push_keep_alive(&self, id: ChannelId) -> bool {
        self.channel(id).is_some_and(|c| c.push_keep_alive())
    }

    /// Unsubscribe a channel on behalf of the liveness monitor.
    pub fn evict(&self, id: ChannelId) -> bool {
        let removed = self.unsubscribe(id);
        if removed {
            self.inner.evicted.fetch_add(1, Ordering::Relaxed);
        }
        removed
    }

    pub fn channel_info(&self, id: ChannelId) -> Option<ChannelInfo> {
        self.channel(id).map(|c| c.info(Instant::now()))
    }

    /// Snapshot of every registered channel.
    pub fn channels(&self) -> Vec<ChannelInfo> {
        let now = Instant::now();
        let channels: Vec<Arc<SubscriberChannel>> =
            self.inner.channels.read().values().cloned().collect();
        channels.iter().map(|c| c.info(now)).collect()
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.channels.read().len()
    }

    pub fn stats(&self) -> HubStats {
        HubStats {
            published: *self.inner.publish_lock.lock(),
            dropped: self.inner.dropped.load(Ordering::Relaxed),
            evicted: self.inner.evicted.load(Ordering::Relaxed),
            subscribers: self.subscriber_count(),
        }
    }

    fn channel(&self, id: ChannelId) -> Option<Arc<SubscriberChannel>> {
        self.inner.channels.read().get(&id).cloned()
    }
}

impl Default for Hub {
    fn default() -> Self {
        Self::new(HubConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sequence(outcome: ReadOutcome) -> u64 {
        match outcome {
            ReadOutcome::Event(e) => e.sequence,
            other => panic!("expected event, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_every_subscriber_sees_every_event() {
        let hub = Hub::default();
        let a = hub.subscribe();
        let b = hub.subscribe();

        for i in 0..3 {
            hub.publish("tick", json!({ "i": i }));
        }

        for id in [a, b] {
            for expected in 1..=3 {
                assert_eq!(sequence(hub.read(id).await), expected);
            }
        }
    }

    #[tokio::test]
    async fn test_late_subscriber_starts_at_next_event() {
        let hub = Hub::default();
        hub.publish("before", json!(null));
        let id = hub.subscribe();
        hub.publish("after", json!(null));

        match hub.read(id).await {
            ReadOutcome::Event(e) => {
                assert_eq!(e.sequence, 2);
                assert_eq!(e.topic, "after");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unsubscribe_is_idempotent() {
        let hub = Hub::default();
        let id = hub.subscribe();
        let other = hub.subscribe();

        assert!(hub.unsubscribe(id));
        assert!(!hub.unsubscribe(id));
        assert!(!hub.unsubscribe(ChannelId(999)));
        assert_eq!(hub.subscriber_count(), 1);
        assert!(hub.channel_info(other).is_some());
        assert!(matches!(hub.read(id).await, ReadOutcome::Closed));
    }

    #[tokio::test]
    async fn test_channel_ids_are_not_reused() {
        let hub = Hub::default();
        let first = hub.subscribe();
        hub.unsubscribe(first);
        let second = hub.subscribe();
        assert_ne!(first, second);
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_times_out_as_idle() {
        let hub = Hub::default();
        let id = hub.subscribe();
        assert!(matches!(hub.read(id).await, ReadOutcome::Idle));
    }

    #[tokio::test]
    async fn test_unsubscribe_wakes_blocked_reader() {
        let hub = Hub::new(HubConfig {
            read_timeout: Duration::from_secs(60),
            ..HubConfig::default()
        });
        let id = hub.subscribe();

        let reader = {
            let hub = hub.clone();
            tokio::spawn(async move { hub.read(id).await })
        };
        tokio::task::yield_now().await;
        hub.unsubscribe(id);

        let outcome = reader.await.unwrap();
        assert!(matches!(outcome, ReadOutcome::Closed));
    }

    #[tokio::test]
    async fn test_publish_wakes_blocked_reader() {
        let hub = Hub::new(HubConfig {
            read_timeout: Duration::from_secs(60),
            ..HubConfig::default()
        });
        let id = hub.subscribe();

        let reader = {
            let hub = hub.clone();
            tokio::spawn(async move { hub.read(id).await })
        };
        tokio::task::yield_now().await;
        hub.publish("wake", json!(true));

        assert_eq!(sequence(reader.await.unwrap()), 1);
    }

    #[tokio::test]
    async fn test_stats_count_overflow() {
        let hub = Hub::new(HubConfig {
            channel_capacity: 2,
            ..HubConfig::default()
        });
        let slow = hub.subscribe();
        for _ in 0..5 {
            hub.publish("burst", json!(null));
        }

        let stats = hub.stats();
        assert_eq!(stats.published, 5);
        assert_eq!(stats.dropped, 3);
        assert_eq!(stats.subscribers, 1);

        let info = hub.channel_info(slow).unwrap();
        assert_eq!(info.state, ChannelState::Draining);
        assert_eq!(sequence(hub.read(slow).await), 4);
        assert_eq!(sequence(hub.read(slow).await), 5);
    }
}
