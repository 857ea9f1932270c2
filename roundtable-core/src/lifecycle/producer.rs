//! The seam between the controller and domain producers.

use crate::events::SharedEvent;
use crate::hub::Hub;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use uuid::Uuid;

use super::controller::RunConfig;
use super::error::ProducerError;

/// Domain logic that generates the events of a run.
///
/// `produce` is spawned on its own task. It should check the cancellation
/// signal at its suspension points and return once it fires; if it does
/// not, the controller aborts it after the stop grace period.
#[async_trait]
pub trait Producer: Send + Sync + 'static {
    /// Checked while the run is `Starting`. An error ends the run before it
    /// reaches `Running`.
    fn prepare(&self, _config: &RunConfig) -> Result<(), ProducerError> {
        Ok(())
    }

    async fn produce(&self, config: RunConfig, ctx: RunContext) -> Result<(), ProducerError>;
}

/// Cooperative cancellation signal of one run.
#[derive(Debug, Clone)]
pub struct CancelSignal {
    rx: watch::Receiver<bool>,
}

impl CancelSignal {
    pub(crate) fn new(rx: watch::Receiver<bool>) -> Self {
        Self { rx }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once cancellation is requested or the run is gone.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }

    /// Sleep for `duration` unless cancelled first.
    ///
    /// Returns `false` if the sleep was cut short by cancellation.
    pub async fn sleep(&self, duration: Duration) -> bool {
        tokio::select! {
            biased;
            _ = self.cancelled() => false,
            _ = tokio::time::sleep(duration) => true,
        }
    }
}

/// Publishes through the hub and records everything the run published.
///
/// Once the run has ended the publisher is closed and further publishes
/// are dropped.
#[derive(Clone)]
pub struct RunPublisher {
    hub: Hub,
    state: Arc<Mutex<PublisherState>>,
}

struct PublisherState {
    open: bool,
    transcript: Vec<SharedEvent>,
}

impl RunPublisher {
    pub(crate) fn new(hub: Hub) -> Self {
        Self {
            hub,
            state: Arc::new(Mutex::new(PublisherState {
                open: true,
                transcript: Vec::new(),
            })),
        }
    }

    /// Returns `None` if the run has already ended.
    pub fn publish(
        &self,
        topic: impl Into<String>,
        payload: serde_json::Value,
    ) -> Option<SharedEvent> {
        // Held across the hub publish so nothing lands after the closing event.
        let mut state = self.state.lock();
        if !state.open {
            return None;
        }
        let event = self.hub.publish(topic, payload);
        state.transcript.push(Arc::clone(&event));
        Some(event)
    }

    pub fn publish_json<T: Serialize>(
        &self,
        topic: impl Into<String>,
        payload: &T,
    ) -> Result<Option<SharedEvent>, serde_json::Error> {
        let value = serde_json::to_value(payload)?;
        Ok(self.publish(topic, value))
    }

    /// Publish `last` (if any), close the publisher and take the recorded
    /// events, ordered by sequence number.
    pub(crate) fn close(&self, last: Option<(&str, serde_json::Value)>) -> Vec<SharedEvent> {
        let mut state = self.state.lock();
        if state.open {
            if let Some((topic, payload)) = last {
                let event = self.hub.publish(topic, payload);
                state.transcript.push(event);
            }
        }
        state.open = false;
        let mut events = std::mem::take(&mut state.transcript);
        events.sort_by_key(|e| e.sequence);
        events
    }
}

/// Everything a producer gets from the controller.
#[derive(Clone)]
pub struct RunContext {
    run_id: Uuid,
    cancel: CancelSignal,
    publisher: RunPublisher,
}

impl RunContext {
    pub(crate) fn new(run_id: Uuid, cancel: CancelSignal, publisher: RunPublisher) -> Self {
        Self {
            run_id,
            cancel,
            publisher,
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn cancel_signal(&self) -> &CancelSignal {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Returns `None` if the run has already ended.
    pub fn publish(
        &self,
        topic: impl Into<String>,
        payload: serde_json::Value,
    ) -> Option<SharedEvent> {
        self.publisher.publish(topic, payload)
    }

    /// Fails with [`ProducerError::RunEnded`] once the run is over, so a
    /// producer using `?` stops there.
    pub fn publish_json<T: Serialize>(
        &self,
        topic: impl Into<String>,
        payload: &T,
    ) -> Result<SharedEvent, ProducerError> {
        self.publisher
            .publish_json(topic, payload)?
            .ok_or(ProducerError::RunEnded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closed_publisher_drops_publishes() {
        let hub = Hub::default();
        let publisher = RunPublisher::new(hub.clone());
        let late = publisher.clone();

        assert!(publisher.publish("a", serde_json::json!(1)).is_some());
        let events = publisher.close(Some(("end", serde_json::json!(null))));
        assert_eq!(
            events.iter().map(|e| e.sequence).collect::<Vec<_>>(),
            [1, 2]
        );
        assert_eq!(events[1].topic, "end");

        assert!(late.publish("b", serde_json::json!(2)).is_none());
        assert!(matches!(late.publish_json("b", &2), Ok(None)));
        assert!(publisher.close(Some(("end", serde_json::json!(null)))).is_empty());
        assert_eq!(hub.stats().published, 2);
    }
}
