#![allow(dead_code)]

use async_trait::async_trait;
use roundtable_core::events::{ChannelId, SharedEvent};
use roundtable_core::hub::{Hub, ReadOutcome};
use roundtable_core::lifecycle::{Producer, ProducerError, RunConfig, RunContext};
use std::time::Duration;
use tokio::sync::mpsc;

/// Read the next event, skipping idle timeouts and keep-alives.
pub async fn next_event(hub: &Hub, id: ChannelId) -> SharedEvent {
    loop {
        match hub.read(id).await {
            ReadOutcome::Event(event) => return event,
            ReadOutcome::KeepAlive | ReadOutcome::Idle => continue,
            ReadOutcome::Closed => panic!("channel {id} closed"),
        }
    }
}

/// Publishes nothing and returns once cancelled.
pub struct UntilCancelled;

#[async_trait]
impl Producer for UntilCancelled {
    async fn produce(&self, _config: RunConfig, ctx: RunContext) -> Result<(), ProducerError> {
        ctx.cancel_signal().cancelled().await;
        Ok(())
    }
}

/// Publishes `count` messages, then returns.
pub struct Burst {
    pub count: usize,
    pub pause: Duration,
}

#[async_trait]
impl Producer for Burst {
    async fn produce(&self, _config: RunConfig, ctx: RunContext) -> Result<(), ProducerError> {
        for i in 0..self.count {
            ctx.publish_json("agent_message", &serde_json::json!({ "i": i }))?;
            if !self.pause.is_zero() && !ctx.cancel_signal().sleep(self.pause).await {
                break;
            }
        }
        Ok(())
    }
}

/// Publishes once, then fails.
pub struct Faulty;

#[async_trait]
impl Producer for Faulty {
    async fn produce(&self, _config: RunConfig, ctx: RunContext) -> Result<(), ProducerError> {
        ctx.publish("agent_message", serde_json::json!("last words"));
        Err(ProducerError::failed("model backend unreachable"))
    }
}

pub struct Panics;

#[async_trait]
impl Producer for Panics {
    async fn produce(&self, _config: RunConfig, _ctx: RunContext) -> Result<(), ProducerError> {
        panic!("lost the plot");
    }
}

/// Never looks at its cancellation signal.
pub struct Stubborn;

#[async_trait]
impl Producer for Stubborn {
    async fn produce(&self, _config: RunConfig, _ctx: RunContext) -> Result<(), ProducerError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(())
    }
}

/// Blocks its worker thread instead of awaiting.
pub struct Blocking {
    pub hold: Duration,
}

#[async_trait]
impl Producer for Blocking {
    async fn produce(&self, _config: RunConfig, _ctx: RunContext) -> Result<(), ProducerError> {
        std::thread::sleep(self.hold);
        Ok(())
    }
}

/// Returns at once, leaving a task that publishes after `delay`.
///
/// Whether that late publish went through is reported on `late_tx`.
pub struct Detached {
    pub delay: Duration,
    pub late_tx: mpsc::UnboundedSender<bool>,
}

#[async_trait]
impl Producer for Detached {
    async fn produce(&self, _config: RunConfig, ctx: RunContext) -> Result<(), ProducerError> {
        let delay = self.delay;
        let late_tx = self.late_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let published = ctx.publish("agent_message", serde_json::json!("too late"));
            let _ = late_tx.send(published.is_some());
        });
        Ok(())
    }
}
