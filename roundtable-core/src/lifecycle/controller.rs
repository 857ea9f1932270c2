//! RunController.
//!
//! The RunController is responsible for:
//! - Guarding the single-run invariant (`start` is rejected unless `Idle`)
//! - Owning the cancellation signal of the active run
//! - Spawning the producer and supervising it until it ends
//! - Funnelling every way a run can end into one finalizer, which
//!   publishes `run_ended`, hands the transcript off and returns to `Idle`
//!
//! All transitions happen under one mutex that is never held across an
//! await point. Observers follow the state through a `watch` channel.

use crate::events::{RunTranscript, TranscriptSender};
use crate::hub::Hub;
use parking_lot::Mutex;
use roundtable_sdk::objects::{
    EndReason, RunEnded, RunPhase, RunStarted, RunStatus, RunStopping, topics,
};
use std::sync::Arc;
use std::time::Duration;
use time::OffsetDateTime;
use tokio::sync::{oneshot, watch};
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::error::{LifecycleError, ProducerError};
use super::producer::{CancelSignal, Producer, RunContext, RunPublisher};

/// Default time a cancelled producer gets to return before it is aborted.
pub const DEFAULT_STOP_GRACE: Duration = Duration::from_secs(5);

/// Controller settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerConfig {
    pub stop_grace: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            stop_grace: DEFAULT_STOP_GRACE,
        }
    }
}

/// What to run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    /// Name of the run; for scripted conversations, the scenario id.
    pub name: String,
    /// Producer-specific parameters.
    pub params: serde_json::Value,
}

impl RunConfig {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: serde_json::Value::Null,
        }
    }
}

/// Returned by an accepted `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunTicket {
    pub run_id: Uuid,
    pub started_at: OffsetDateTime,
}

struct ActiveRun {
    run_id: Uuid,
    name: String,
    started_at: OffsetDateTime,
    cancel_tx: watch::Sender<bool>,
    publisher: RunPublisher,
}

struct RunSlot {
    phase: RunPhase,
    active: Option<ActiveRun>,
}

impl RunSlot {
    fn status(&self) -> RunStatus {
        match &self.active {
            Some(run) => RunStatus {
                phase: self.phase,
                is_running: self.phase.is_active(),
                run_id: Some(run.run_id),
                name: Some(run.name.clone()),
                started_at: Some(run.started_at),
            },
            None => RunStatus {
                phase: self.phase,
                ..RunStatus::idle()
            },
        }
    }
}

/// How a run ended, before it is turned into a `run_ended` payload.
#[derive(Debug, Clone, PartialEq, Eq)]
struct RunOutcome {
    reason: EndReason,
    detail: Option<String>,
}

impl RunOutcome {
    fn completed() -> Self {
        Self {
            reason: EndReason::Completed,
            detail: None,
        }
    }

    fn stopped() -> Self {
        Self {
            reason: EndReason::Stopped,
            detail: None,
        }
    }

    fn error(detail: impl std::fmt::Display) -> Self {
        Self {
            reason: EndReason::Error,
            detail: Some(detail.to_string()),
        }
    }

    fn from_join(joined: Result<Result<(), ProducerError>, JoinError>, cancelled: bool) -> Self {
        match joined {
            Ok(Ok(())) if cancelled => Self::stopped(),
            Ok(Ok(())) => Self::completed(),
            Ok(Err(e)) => Self::error(e),
            Err(e) if e.is_cancelled() => Self::stopped(),
            Err(e) => Self::error(panic_message(e)),
        }
    }
}

fn panic_message(e: JoinError) -> String {
    let payload = e.into_panic();
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("producer panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("producer panicked: {s}")
    } else {
        "producer panicked".to_string()
    }
}

/// Single-run lifecycle controller. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct RunController {
    inner: Arc<ControllerInner>,
}

struct ControllerInner {
    hub: Hub,
    producer: Arc<dyn Producer>,
    transcripts: Option<TranscriptSender>,
    config: ControllerConfig,
    slot: Mutex<RunSlot>,
    status_tx: watch::Sender<RunStatus>,
}

impl RunController {
    /// Create a controller.
    ///
    /// `transcripts` receives the transcript of every finished run; pass
    /// `None` when nothing persists runs.
    pub fn new(
        hub: Hub,
        producer: Arc<dyn Producer>,
        transcripts: Option<TranscriptSender>,
        config: ControllerConfig,
    ) -> Self {
        let (status_tx, _) = watch::channel(RunStatus::idle());
        Self {
            inner: Arc::new(ControllerInner {
                hub,
                producer,
                transcripts,
                config,
                slot: Mutex::new(RunSlot {
                    phase: RunPhase::Idle,
                    active: None,
                }),
                status_tx,
            }),
        }
    }

    pub fn hub(&self) -> &Hub {
        &self.inner.hub
    }

    /// Start a run.
    ///
    /// Fails with [`LifecycleError::AlreadyRunning`] unless the controller
    /// is idle. An accepted run whose producer cannot be prepared or
    /// spawned still returns a ticket; the failure is reported as
    /// `run_ended{reason=error}` and the controller is idle again.
    pub fn start(&self, config: RunConfig) -> Result<RunTicket, LifecycleError> {
        let mut slot = self.inner.slot.lock();
        if slot.phase != RunPhase::Idle {
            debug!(phase = %slot.phase, name = %config.name, "Start rejected, run already active");
            return Err(LifecycleError::AlreadyRunning { phase: slot.phase });
        }

        let run_id = Uuid::now_v7();
        let started_at = OffsetDateTime::now_utc();
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let publisher = RunPublisher::new(self.inner.hub.clone());

        slot.phase = RunPhase::Starting;
        slot.active = Some(ActiveRun {
            run_id,
            name: config.name.clone(),
            started_at,
            cancel_tx,
            publisher: publisher.clone(),
        });
        self.announce(&slot);
        info!(%run_id, name = %config.name, "Run starting");

        let ticket = RunTicket { run_id, started_at };

        if let Err(e) = self.inner.producer.prepare(&config) {
            error!(%run_id, error = %e, "Producer failed to prepare");
            self.finalize_locked(&mut slot, run_id, RunOutcome::error(e));
            return Ok(ticket);
        }

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            error!(%run_id, "No async runtime to spawn the producer on");
            self.finalize_locked(
                &mut slot,
                run_id,
                RunOutcome::error(ProducerError::Resource("no async runtime".into())),
            );
            return Ok(ticket);
        };

        let (ready_tx, ready_rx) = oneshot::channel();
        runtime.spawn(self.clone().supervise(
            run_id,
            config.clone(),
            CancelSignal::new(cancel_rx),
            publisher.clone(),
            ready_rx,
        ));

        slot.phase = RunPhase::Running;
        self.announce(&slot);
        let started = RunStarted {
            run_id,
            name: config.name,
        };
        if let Err(e) = publisher.publish_json(topics::RUN_STARTED, &started) {
            error!(%run_id, error = %e, "Failed to serialize run_started");
        }
        // The producer only begins once run_started is out.
        let _ = ready_tx.send(());
        info!(%run_id, "Run running");

        Ok(ticket)
    }

    /// Request the active run to stop.
    ///
    /// Returns `false` when there is nothing to stop (idle, or already
    /// stopping). Teardown continues in the background.
    pub fn stop(&self) -> bool {
        let mut slot = self.inner.slot.lock();
        if !matches!(slot.phase, RunPhase::Starting | RunPhase::Running) {
            debug!(phase = %slot.phase, "Stop ignored");
            return false;
        }
        let Some(run) = slot.active.as_ref() else {
            return false;
        };

        let run_id = run.run_id;
        let _ = run.cancel_tx.send(true);
        if let Err(e) = run
            .publisher
            .publish_json(topics::RUN_STOPPING, &RunStopping { run_id })
        {
            error!(%run_id, error = %e, "Failed to serialize run_stopping");
        }

        slot.phase = RunPhase::Stopping;
        self.announce(&slot);
        info!(%run_id, "Run stopping");
        true
    }

    /// Current state snapshot.
    pub fn status(&self) -> RunStatus {
        self.inner.status_tx.borrow().clone()
    }

    /// Follow state changes.
    pub fn watch_status(&self) -> watch::Receiver<RunStatus> {
        self.inner.status_tx.subscribe()
    }

    /// Resolves once the controller is idle.
    pub async fn wait_idle(&self) {
        let mut rx = self.watch_status();
        let _ = rx.wait_for(|status| status.phase == RunPhase::Idle).await;
    }

    async fn supervise(
        self,
        run_id: Uuid,
        config: RunConfig,
        cancel: CancelSignal,
        publisher: RunPublisher,
        ready_rx: oneshot::Receiver<()>,
    ) {
        if ready_rx.await.is_err() {
            self.finalize(run_id, RunOutcome::error("run abandoned before it started"));
            return;
        }

        let ctx = RunContext::new(run_id, cancel.clone(), publisher);
        let producer = Arc::clone(&self.inner.producer);
        let mut task: JoinHandle<Result<(), ProducerError>> =
            tokio::spawn(async move { producer.produce(config, ctx).await });

        let outcome = tokio::select! {
            joined = &mut task => RunOutcome::from_join(joined, cancel.is_cancelled()),
            _ = cancel.cancelled() => self.drain_cancelled(run_id, &mut task).await,
        };

        self.finalize(run_id, outcome);
    }

    /// Give a cancelled producer the grace period, then abort it.
    async fn drain_cancelled(
        &self,
        run_id: Uuid,
        task: &mut JoinHandle<Result<(), ProducerError>>,
    ) -> RunOutcome {
        match tokio::time::timeout(self.inner.config.stop_grace, &mut *task).await {
            Ok(joined) => RunOutcome::from_join(joined, true),
            Err(_) => {
                warn!(
                    %run_id,
                    grace = ?self.inner.config.stop_grace,
                    "Producer ignored cancellation, aborting"
                );
                // A producer blocking its thread never reaches an await
                // point, so the aborted task is left to finish on its own.
                task.abort();
                RunOutcome::stopped()
            }
        }
    }

    fn finalize(&self, run_id: Uuid, outcome: RunOutcome) {
        let mut slot = self.inner.slot.lock();
        self.finalize_locked(&mut slot, run_id, outcome);
    }

    /// The one exit of every run.
    fn finalize_locked(&self, slot: &mut RunSlot, run_id: Uuid, outcome: RunOutcome) {
        let Some(run) = slot.active.take_if(|run| run.run_id == run_id) else {
            warn!(%run_id, "Finalizer called for a run that is not active");
            return;
        };

        if slot.phase != RunPhase::Stopping {
            slot.phase = RunPhase::Stopping;
            self.announce_run(slot.phase, &run);
        }

        let ended = RunEnded {
            run_id,
            reason: outcome.reason,
            detail: outcome.detail.clone(),
        };
        let last = match serde_json::to_value(&ended) {
            Ok(payload) => Some((topics::RUN_ENDED, payload)),
            Err(e) => {
                error!(%run_id, error = %e, "Failed to serialize run_ended");
                None
            }
        };
        // Closing here makes run_ended the last event of the run, even for
        // producer tasks that outlive it.
        let events = run.publisher.close(last);

        let transcript = RunTranscript {
            run_id,
            name: run.name.clone(),
            reason: outcome.reason,
            detail: outcome.detail,
            started_at: run.started_at,
            ended_at: OffsetDateTime::now_utc(),
            events,
        };
        self.hand_off(transcript);

        slot.phase = RunPhase::Idle;
        self.announce(slot);
        info!(%run_id, reason = %outcome.reason, "Run ended");
    }

    fn hand_off(&self, transcript: RunTranscript) {
        let Some(sender) = &self.inner.transcripts else {
            return;
        };
        let run_id = transcript.run_id;
        if let Err(e) = sender.try_send(transcript) {
            error!(%run_id, error = %e, "Failed to hand off run transcript");
        }
    }

    fn announce(&self, slot: &RunSlot) {
        self.inner.status_tx.send_replace(slot.status());
    }

    /// Like `announce`, for when the run was already taken out of the slot.
    fn announce_run(&self, phase: RunPhase, run: &ActiveRun) {
        self.inner.status_tx.send_replace(RunStatus {
            phase,
            is_running: phase.is_active(),
            run_id: Some(run.run_id),
            name: Some(run.name.clone()),
            started_at: Some(run.started_at),
        });
    }
}
