//! Per-subscriber bounded queue.
//!
//! A channel is written by the hub (publish, keep-alives) and read by
//! exactly one transport task. Writers never wait: a full queue drops its
//! oldest item and the channel is marked [`ChannelState::Draining`] until
//! the reader catches up.

use crate::events::{ChannelId, SharedEvent};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;

/// Lifecycle of a subscriber channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    /// Reader keeps up with the publisher.
    Active,
    /// At least one item was dropped since the queue was last empty.
    Draining,
    /// Unsubscribed or evicted; no further items are accepted.
    Closed,
}

/// An item waiting in a channel.
#[derive(Debug, Clone)]
pub enum Delivery {
    Event(SharedEvent),
    /// Pushed by the liveness monitor into this channel only.
    KeepAlive,
}

/// Result of a single push.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Pushed {
    Queued,
    /// The oldest item was evicted to make room.
    Overflowed,
    Rejected,
}

pub(crate) enum Next {
    Item(Delivery),
    Empty,
    Closed,
}

/// Point-in-time view of a channel, used by the monitor and for
/// observability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelInfo {
    pub id: ChannelId,
    pub state: ChannelState,
    pub queued: usize,
    /// Items lost to drop-oldest over the channel's lifetime.
    pub dropped: u64,
    /// Time since the last successful read (or since subscribe).
    pub idle_for: Duration,
    /// Time spent in `Draining`, if currently draining.
    pub draining_for: Option<Duration>,
}

struct Queue {
    items: VecDeque<Delivery>,
    state: ChannelState,
    last_read_at: Instant,
    draining_since: Option<Instant>,
    dropped: u64,
}

pub(crate) struct SubscriberChannel {
    id: ChannelId,
    capacity: usize,
    queue: Mutex<Queue>,
    notify: Notify,
}

impl SubscriberChannel {
    pub(crate) fn new(id: ChannelId, capacity: usize) -> Self {
        Self {
            id,
            capacity: capacity.max(1),
            queue: Mutex::new(Queue {
                items: VecDeque::with_capacity(capacity.clamp(1, 1024)),
                state: ChannelState::Active,
                last_read_at: Instant::now(),
                draining_since: None,
                dropped: 0,
            }),
            notify: Notify::new(),
        }
    }

    pub(crate) fn id(&self) -> ChannelId {
        self.id
    }

    pub(crate) fn push(&self, item: Delivery) -> Pushed {
        let mut queue = self.queue.lock();
        if queue.state == ChannelState::Closed {
            return Pushed::Rejected;
        }

        let mut pushed = Pushed::Queued;
        if queue.items.len() >= self.capacity {
            queue.items.pop_front();
            queue.dropped += 1;
            if queue.state == ChannelState::Active {
                queue.state = ChannelState::Draining;
                queue.draining_since = Some(Instant::now());
            }
            pushed = Pushed::Overflowed;
        }
        queue.items.push_back(item);
        drop(queue);

        self.notify.notify_one();
        pushed
    }

    /// Push a keep-alive unless something is already waiting to be read.
    pub(crate) fn push_keep_alive(&self) -> bool {
        {
            let queue = self.queue.lock();
            if queue.state == ChannelState::Closed || !queue.items.is_empty() {
                return false;
            }
        }
        self.push(Delivery::KeepAlive) == Pushed::Queued
    }

    pub(crate) fn take(&self) -> Next {
        let mut queue = self.queue.lock();
        match queue.items.pop_front() {
            Some(item) => {
                queue.last_read_at = Instant::now();
                if queue.items.is_empty() && queue.state == ChannelState::Draining {
                    queue.state = ChannelState::Active;
                    queue.draining_since = None;
                }
                Next::Item(item)
            }
            None if queue.state == ChannelState::Closed => Next::Closed,
            None => Next::Empty,
        }
    }

    /// Close the channel, discard its queue and wake the reader.
    pub(crate) fn close(&self) {
        {
            let mut queue = self.queue.lock();
            queue.state = ChannelState::Closed;
            queue.items.clear();
            queue.draining_since = None;
        }
        self.notify.notify_waiters();
        self.notify.notify_one();
    }

    pub(crate) fn info(&self, now: Instant) -> ChannelInfo {
        let queue = self.queue.lock();
        ChannelInfo {
            id: self.id,
            state: queue.state,
            queued: queue.items.len(),
            dropped: queue.dropped,
            idle_for: now.saturating_duration_since(queue.last_read_at),
            draining_for: queue
                .draining_since
                .map(|since| now.saturating_duration_since(since)),
        }
    }

    pub(crate) fn notify(&self) -> &Notify {
        &self.notify
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Event;
    use std::sync::Arc;

    fn event(sequence: u64) -> Delivery {
        Delivery::Event(Arc::new(Event {
            sequence,
            topic: "test".into(),
            payload: serde_json::Value::Null,
            timestamp: time::OffsetDateTime::UNIX_EPOCH,
        }))
    }

    fn sequence_of(next: Next) -> Option<u64> {
        match next {
            Next::Item(Delivery::Event(e)) => Some(e.sequence),
            _ => None,
        }
    }

    #[test]
    fn test_drop_oldest_marks_draining() {
        let channel = SubscriberChannel::new(ChannelId(1), 2);
        assert_eq!(channel.push(event(1)), Pushed::Queued);
        assert_eq!(channel.push(event(2)), Pushed::Queued);
        assert_eq!(channel.push(event(3)), Pushed::Overflowed);

        let info = channel.info(Instant::now());
        assert_eq!(info.state, ChannelState::Draining);
        assert_eq!(info.queued, 2);
        assert_eq!(info.dropped, 1);

        assert_eq!(sequence_of(channel.take()), Some(2));
        assert_eq!(channel.info(Instant::now()).state, ChannelState::Draining);
        assert_eq!(sequence_of(channel.take()), Some(3));
        assert_eq!(channel.info(Instant::now()).state, ChannelState::Active);
    }

    #[test]
    fn test_keep_alive_only_into_empty_queue() {
        let channel = SubscriberChannel::new(ChannelId(1), 4);
        assert!(channel.push_keep_alive());
        assert!(!channel.push_keep_alive());
        assert!(matches!(channel.take(), Next::Item(Delivery::KeepAlive)));
        assert!(matches!(channel.take(), Next::Empty));
    }

    #[test]
    fn test_closed_channel_rejects_and_reports_closed() {
        let channel = SubscriberChannel::new(ChannelId(1), 4);
        channel.push(event(1));
        channel.close();
        assert_eq!(channel.push(event(2)), Pushed::Rejected);
        assert!(!channel.push_keep_alive());
        assert!(matches!(channel.take(), Next::Closed));
    }
}
