//! Contract Test: Poll Cycle Semantics
//!
//! Constraints verified:
//! - The published snapshot always equals the latest successful fetch
//! - A failed fetch is never mistaken for "no change"
//! - A change produces exactly one change notification
//! - The first observation only seeds state
//! - Notification failure never stops a snapshot from being published

mod common;

use common::*;
use namewatch_core::config::NotifyMode;
use namewatch_core::notify::NotificationKind;
use namewatch_core::{
    Classification, CycleOutcome, MemorySink, NotificationAction, PollEvent, PollLoop, SharedState,
};
use std::sync::atomic::Ordering;

#[tokio::test]
async fn change_between_two_cycles_notifies_once() {
    let state = SharedState::new();
    let sink = MemorySink::new();

    let (mut poll_loop, _events) = PollLoop::new(
        Box::new(ScriptedTransport::names(&["A", "B"])),
        Box::new(sink.clone()),
        state.clone(),
        minimal_config(),
    )
    .expect("poll loop construction succeeds");

    let first = poll_loop.run_cycle().await;
    assert_eq!(
        first,
        CycleOutcome::Observed {
            classification: Classification::FirstObservation,
            notification: NotificationAction::None,
        }
    );
    assert_eq!(state.read().await.unwrap().name(), "A");

    let second = poll_loop.run_cycle().await;
    assert_eq!(
        second,
        CycleOutcome::Observed {
            classification: Classification::Changed {
                previous: "A".to_string()
            },
            notification: NotificationAction::Sent(NotificationKind::Change),
        }
    );

    let messages = sink.messages();
    assert_eq!(messages.len(), 1, "exactly one change notification");
    assert!(messages[0].body.contains("from 'A' to 'B'"));

    let snapshot = state.read().await.unwrap();
    assert_eq!(snapshot.name(), "B");
    assert!(snapshot.changed());
    assert!(snapshot.last_changed_at().is_some());
}

#[tokio::test]
async fn failed_fetch_keeps_previous_snapshot() {
    let state = SharedState::new();
    let sink = MemorySink::new();

    let transport = ScriptedTransport::new(vec![
        found("A"),
        server_error(),
        found("A"),
        found("B"),
    ]);

    let (mut poll_loop, _events) = PollLoop::new(
        Box::new(transport),
        Box::new(sink.clone()),
        state.clone(),
        minimal_config(),
    )
    .expect("poll loop construction succeeds");

    poll_loop.run_cycle().await;
    let after_first = state.read().await.unwrap();

    let skipped = poll_loop.run_cycle().await;
    assert!(matches!(skipped, CycleOutcome::Skipped { .. }));
    assert_eq!(
        state.read().await.unwrap(),
        after_first,
        "a failed cycle must not touch the snapshot"
    );

    // The value remembered before the failure is still the comparison base
    let third = poll_loop.run_cycle().await;
    assert!(matches!(
        third,
        CycleOutcome::Observed {
            classification: Classification::Unchanged,
            ..
        }
    ));

    poll_loop.run_cycle().await;
    assert_eq!(state.read().await.unwrap().name(), "B");
    assert_eq!(sink.len(), 1);
}

#[tokio::test]
async fn snapshot_tracks_latest_successful_value() {
    let state = SharedState::new();
    let script = vec![
        found("A"),
        server_error(),
        found("B"),
        server_error(),
        server_error(),
        found("C"),
        found("C"),
    ];
    let expected = ["A", "A", "B", "B", "B", "C", "C"];

    let (mut poll_loop, _events) = PollLoop::new(
        Box::new(ScriptedTransport::new(script)),
        Box::new(MemorySink::new()),
        state.clone(),
        minimal_config(),
    )
    .expect("poll loop construction succeeds");

    for name in expected {
        poll_loop.run_cycle().await;
        assert_eq!(state.read().await.unwrap().name(), name);
    }
}

#[tokio::test]
async fn nothing_is_published_before_first_success() {
    let state = SharedState::new();

    let (mut poll_loop, _events) = PollLoop::new(
        Box::new(ScriptedTransport::new(vec![server_error()])),
        Box::new(MemorySink::new()),
        state.clone(),
        minimal_config(),
    )
    .expect("poll loop construction succeeds");

    poll_loop.run_cycle().await;
    assert!(state.read().await.is_none());
}

#[tokio::test]
async fn notification_failure_does_not_abort_cycle() {
    let state = SharedState::new();
    let sink = FailingSink::new();
    let attempts = sink.counter();

    let (mut poll_loop, _events) = PollLoop::new(
        Box::new(ScriptedTransport::names(&["A", "B"])),
        Box::new(sink),
        state.clone(),
        minimal_config(),
    )
    .expect("poll loop construction succeeds");

    poll_loop.run_cycle().await;
    let outcome = poll_loop.run_cycle().await;

    assert!(matches!(
        outcome,
        CycleOutcome::Observed {
            notification: NotificationAction::Failed(NotificationKind::Change),
            ..
        }
    ));
    assert_eq!(attempts.load(Ordering::SeqCst), 1);
    assert_eq!(state.read().await.unwrap().name(), "B");
}

#[tokio::test]
async fn change_only_mode_stays_quiet_while_unchanged() {
    let mut config = minimal_config();
    config.notify.mode = NotifyMode::ChangeOnly;
    let sink = MemorySink::new();

    let (mut poll_loop, _events) = PollLoop::new(
        Box::new(ScriptedTransport::names(&["A", "A", "A"])),
        Box::new(sink.clone()),
        SharedState::new(),
        config,
    )
    .expect("poll loop construction succeeds");

    for _ in 0..3 {
        poll_loop.run_cycle().await;
    }

    assert!(sink.is_empty());
}

#[tokio::test]
async fn events_describe_the_cycle() {
    let (mut poll_loop, mut events) = PollLoop::new(
        Box::new(ScriptedTransport::new(vec![
            found("A"),
            server_error(),
            found("B"),
        ])),
        Box::new(MemorySink::new()),
        SharedState::new(),
        minimal_config(),
    )
    .expect("poll loop construction succeeds");

    for _ in 0..3 {
        poll_loop.run_cycle().await;
    }
    drop(poll_loop);

    let mut received = Vec::new();
    while let Some(event) = events.recv().await {
        received.push(event);
    }

    assert_eq!(
        received,
        vec![
            PollEvent::Observed {
                name: "A".to_string(),
                changed: false
            },
            PollEvent::FetchFailed {
                error: "remote service unavailable: unexpected status 500: Internal Server Error"
                    .to_string()
            },
            PollEvent::NameChanged {
                previous: "A".to_string(),
                current: "B".to_string()
            },
            PollEvent::NotificationSent {
                kind: NotificationKind::Change
            },
            PollEvent::Observed {
                name: "B".to_string(),
                changed: true
            },
        ]
    );
}

#[tokio::test]
async fn invalid_config_prevents_start() {
    let mut config = minimal_config();
    config.target.handle = String::new();

    let result = PollLoop::new(
        Box::new(ScriptedTransport::names(&["A"])),
        Box::new(MemorySink::new()),
        SharedState::new(),
        config,
    );

    assert!(matches!(result, Err(namewatch_core::Error::Config(_))));
}

#[tokio::test]
async fn out_of_range_durations_prevent_start() {
    let mut oversized_reminder = minimal_config();
    oversized_reminder.notify.reminder_interval_secs = u64::MAX;

    let mut oversized_buffer = minimal_config();
    oversized_buffer.retry.reset_buffer_secs = 10_000_000_000_000_000;

    for config in [oversized_reminder, oversized_buffer] {
        let result = PollLoop::new(
            Box::new(ScriptedTransport::names(&["A"])),
            Box::new(MemorySink::new()),
            SharedState::new(),
            config,
        );

        assert!(matches!(result, Err(namewatch_core::Error::Config(_))));
    }
}
