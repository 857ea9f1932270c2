mod common;

use common::{Blocking, Burst, Detached, Faulty, Panics, Stubborn, UntilCancelled, next_event};
use roundtable_core::events::transcript_channel;
use roundtable_core::hub::Hub;
use roundtable_core::lifecycle::{
    ControllerConfig, LifecycleError, Producer, RunConfig, RunController,
};
use roundtable_sdk::objects::{EndReason, RunEnded, RunPhase, RunStarted, topics};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

fn controller(hub: &Hub, producer: impl Producer) -> RunController {
    RunController::new(
        hub.clone(),
        Arc::new(producer),
        None,
        ControllerConfig {
            stop_grace: Duration::from_secs(1),
        },
    )
}

fn ended(event: &roundtable_core::events::Event) -> RunEnded {
    assert_eq!(event.topic, topics::RUN_ENDED);
    serde_json::from_value(event.payload.clone()).unwrap()
}

#[tokio::test(start_paused = true)]
async fn start_reject_stop_roundtrip() {
    let hub = Hub::default();
    let channel = hub.subscribe();
    let controller = controller(&hub, UntilCancelled);

    let ticket = controller.start(RunConfig::named("demo")).unwrap();

    let started = next_event(&hub, channel).await;
    assert_eq!(started.sequence, 1);
    assert_eq!(started.topic, topics::RUN_STARTED);
    let payload: RunStarted = serde_json::from_value(started.payload.clone()).unwrap();
    assert_eq!(payload.run_id, ticket.run_id);
    assert_eq!(payload.name, "demo");

    let status = controller.status();
    assert_eq!(status.phase, RunPhase::Running);
    assert!(status.is_running);
    assert_eq!(status.run_id, Some(ticket.run_id));

    assert_eq!(
        controller.start(RunConfig::named("again")),
        Err(LifecycleError::AlreadyRunning {
            phase: RunPhase::Running
        })
    );
    // a rejected start publishes nothing
    assert_eq!(hub.stats().published, 1);

    assert!(controller.stop());
    let stopping = next_event(&hub, channel).await;
    assert_eq!(stopping.sequence, 2);
    assert_eq!(stopping.topic, topics::RUN_STOPPING);

    let end = next_event(&hub, channel).await;
    assert_eq!(end.sequence, 3);
    let end = ended(&end);
    assert_eq!(end.run_id, ticket.run_id);
    assert_eq!(end.reason, EndReason::Stopped);
    assert_eq!(end.detail, None);

    controller.wait_idle().await;
    assert_eq!(controller.status().phase, RunPhase::Idle);
    assert_eq!(controller.status().run_id, None);
    assert!(!controller.stop());
    assert_eq!(hub.stats().published, 3);
}

#[tokio::test(start_paused = true)]
async fn stop_while_stopping_is_not_accepted() {
    let hub = Hub::default();
    let controller = controller(&hub, Stubborn);

    controller.start(RunConfig::named("slow")).unwrap();
    assert!(controller.stop());
    assert_eq!(controller.status().phase, RunPhase::Stopping);
    assert!(!controller.stop());
    assert!(matches!(
        controller.start(RunConfig::named("too soon")),
        Err(LifecycleError::AlreadyRunning {
            phase: RunPhase::Stopping
        })
    ));

    controller.wait_idle().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_starts_admit_exactly_one() {
    let hub = Hub::default();
    let controller = controller(&hub, UntilCancelled);
    let barrier = Arc::new(tokio::sync::Barrier::new(16));

    let attempts: Vec<_> = (0..16)
        .map(|i| {
            let controller = controller.clone();
            let barrier = Arc::clone(&barrier);
            tokio::spawn(async move {
                barrier.wait().await;
                controller.start(RunConfig::named(format!("run-{i}")))
            })
        })
        .collect();

    let mut accepted = 0;
    for attempt in attempts {
        match attempt.await.unwrap() {
            Ok(_) => accepted += 1,
            Err(LifecycleError::AlreadyRunning { .. }) => {}
        }
    }
    assert_eq!(accepted, 1);
    // only the winner published
    assert_eq!(hub.stats().published, 1);

    assert!(controller.stop());
    controller.wait_idle().await;
}

#[tokio::test(start_paused = true)]
async fn natural_completion_ends_once_and_hands_off_transcript() {
    let hub = Hub::default();
    let channel = hub.subscribe();
    let (tx, mut rx) = transcript_channel();
    let controller = RunController::new(
        hub.clone(),
        Arc::new(Burst {
            count: 3,
            pause: Duration::from_millis(100),
        }),
        Some(tx),
        ControllerConfig::default(),
    );

    let ticket = controller.start(RunConfig::named("burst")).unwrap();

    let topics_seen: Vec<_> = {
        let mut seen = Vec::new();
        for expected in 1..=5 {
            let event = next_event(&hub, channel).await;
            assert_eq!(event.sequence, expected);
            seen.push(event.topic.clone());
        }
        seen
    };
    assert_eq!(
        topics_seen,
        [
            topics::RUN_STARTED,
            topics::AGENT_MESSAGE,
            topics::AGENT_MESSAGE,
            topics::AGENT_MESSAGE,
            topics::RUN_ENDED,
        ]
    );

    controller.wait_idle().await;

    let transcript = rx.recv().await.unwrap();
    assert_eq!(transcript.run_id, ticket.run_id);
    assert_eq!(transcript.name, "burst");
    assert_eq!(transcript.reason, EndReason::Completed);
    let sequences: Vec<u64> = transcript.events.iter().map(|e| e.sequence).collect();
    assert_eq!(sequences, [1, 2, 3, 4, 5]);

    // exactly one transcript per run
    assert!(rx.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn producer_error_ends_run_with_detail() {
    let hub = Hub::default();
    let channel = hub.subscribe();
    let controller = controller(&hub, Faulty);

    controller.start(RunConfig::named("faulty")).unwrap();
    assert_eq!(next_event(&hub, channel).await.topic, topics::RUN_STARTED);
    assert_eq!(next_event(&hub, channel).await.topic, topics::AGENT_MESSAGE);

    let end = ended(&*next_event(&hub, channel).await);
    assert_eq!(end.reason, EndReason::Error);
    assert_eq!(end.detail.as_deref(), Some("model backend unreachable"));

    controller.wait_idle().await;
    assert_eq!(hub.stats().published, 3);
}

#[tokio::test(start_paused = true)]
async fn producer_panic_is_contained() {
    let hub = Hub::default();
    let channel = hub.subscribe();
    let controller = controller(&hub, Panics);

    controller.start(RunConfig::named("panics")).unwrap();
    assert_eq!(next_event(&hub, channel).await.topic, topics::RUN_STARTED);

    let end = ended(&*next_event(&hub, channel).await);
    assert_eq!(end.reason, EndReason::Error);
    assert!(end.detail.unwrap().contains("lost the plot"));

    controller.wait_idle().await;

    // the controller is usable again
    assert!(controller.start(RunConfig::named("again")).is_ok());
}

#[tokio::test(start_paused = true)]
async fn producer_ignoring_cancellation_is_aborted_after_grace() {
    let hub = Hub::default();
    let channel = hub.subscribe();
    let controller = controller(&hub, Stubborn);

    controller.start(RunConfig::named("stubborn")).unwrap();
    assert_eq!(next_event(&hub, channel).await.topic, topics::RUN_STARTED);

    let stopped_at = tokio::time::Instant::now();
    assert!(controller.stop());
    assert_eq!(next_event(&hub, channel).await.topic, topics::RUN_STOPPING);

    let end = ended(&*next_event(&hub, channel).await);
    assert_eq!(end.reason, EndReason::Stopped);
    assert!(stopped_at.elapsed() >= Duration::from_secs(1));
    assert!(stopped_at.elapsed() < Duration::from_secs(3600));

    controller.wait_idle().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn producer_blocking_its_thread_does_not_wedge_the_controller() {
    let hub = Hub::default();
    let channel = hub.subscribe();
    let controller = RunController::new(
        hub.clone(),
        Arc::new(Blocking {
            hold: Duration::from_secs(3),
        }),
        None,
        ControllerConfig {
            stop_grace: Duration::from_millis(200),
        },
    );

    controller.start(RunConfig::named("blocking")).unwrap();
    assert_eq!(next_event(&hub, channel).await.topic, topics::RUN_STARTED);
    assert!(controller.stop());

    let idle = tokio::time::timeout(Duration::from_secs(1), controller.wait_idle()).await;
    assert!(idle.is_ok(), "controller still {}", controller.status().phase);

    assert_eq!(next_event(&hub, channel).await.topic, topics::RUN_STOPPING);
    let end = ended(&*next_event(&hub, channel).await);
    assert_eq!(end.reason, EndReason::Stopped);
}

#[tokio::test(start_paused = true)]
async fn run_ended_is_the_last_event_of_a_run() {
    let hub = Hub::default();
    let channel = hub.subscribe();
    let (transcript_tx, mut transcript_rx) = transcript_channel();
    let (late_tx, mut late_rx) = mpsc::unbounded_channel();
    let controller = RunController::new(
        hub.clone(),
        Arc::new(Detached {
            delay: Duration::from_millis(50),
            late_tx,
        }),
        Some(transcript_tx),
        ControllerConfig::default(),
    );

    controller.start(RunConfig::named("detached")).unwrap();
    assert_eq!(next_event(&hub, channel).await.topic, topics::RUN_STARTED);
    let end = ended(&*next_event(&hub, channel).await);
    assert_eq!(end.reason, EndReason::Completed);

    // the leftover task tried to publish after the run was over
    assert_eq!(late_rx.recv().await, Some(false));
    assert_eq!(hub.channel_info(channel).unwrap().queued, 0);
    assert_eq!(hub.stats().published, 2);

    let transcript = transcript_rx.recv().await.unwrap();
    let seen: Vec<&str> = transcript.events.iter().map(|e| e.topic.as_str()).collect();
    assert_eq!(seen, [topics::RUN_STARTED, topics::RUN_ENDED]);
}

#[tokio::test(start_paused = true)]
async fn stop_cuts_a_cooperative_producer_short() {
    let hub = Hub::default();
    let channel = hub.subscribe();
    let controller = controller(
        &hub,
        Burst {
            count: 100,
            pause: Duration::from_secs(1),
        },
    );

    controller.start(RunConfig::named("long")).unwrap();
    assert_eq!(next_event(&hub, channel).await.topic, topics::RUN_STARTED);
    assert_eq!(next_event(&hub, channel).await.topic, topics::AGENT_MESSAGE);

    assert!(controller.stop());
    assert_eq!(next_event(&hub, channel).await.topic, topics::RUN_STOPPING);
    let end = ended(&*next_event(&hub, channel).await);
    assert_eq!(end.reason, EndReason::Stopped);

    controller.wait_idle().await;
    assert_eq!(hub.stats().published, 4);
}

#[tokio::test]
async fn status_watch_follows_the_run() {
    let hub = Hub::default();
    let controller = controller(&hub, UntilCancelled);
    let mut status = controller.watch_status();
    assert_eq!(status.borrow_and_update().phase, RunPhase::Idle);

    controller.start(RunConfig::named("watched")).unwrap();
    status
        .wait_for(|s| s.phase == RunPhase::Running)
        .await
        .unwrap();

    controller.stop();
    status.wait_for(|s| s.phase == RunPhase::Idle).await.unwrap();
}
