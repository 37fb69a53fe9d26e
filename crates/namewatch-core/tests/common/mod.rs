//! Test doubles and common utilities for poll loop contract tests
//!
//! This module provides minimal test doubles that let tests script the remote
//! service and observe notifications without any network access.

#![allow(dead_code)]

use namewatch_core::config::WatchConfig;
use namewatch_core::error::{SendError, TransportError};
use namewatch_core::traits::{LookupResponse, NotificationSink, Profile, ProfileTransport};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A transport that replays a fixed script of responses
///
/// Call `n` returns `script[n]`; once the script runs out the last entry is
/// repeated.
pub struct ScriptedTransport {
    script: Vec<Result<LookupResponse, TransportError>>,
    call_count: Arc<AtomicUsize>,
}

impl ScriptedTransport {
    pub fn new(script: Vec<Result<LookupResponse, TransportError>>) -> Self {
        assert!(!script.is_empty(), "script needs at least one response");
        Self {
            script,
            call_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// A transport that answers with the given display names in order
    pub fn names(names: &[&str]) -> Self {
        Self::new(names.iter().map(|name| found(name)).collect())
    }

    /// Shared handle to the call counter
    pub fn counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.call_count)
    }
}

#[async_trait::async_trait]
impl ProfileTransport for ScriptedTransport {
    async fn lookup(&self, _handle: &str) -> Result<LookupResponse, TransportError> {
        let n = self.call_count.fetch_add(1, Ordering::SeqCst);
        let index = n.min(self.script.len() - 1);
        self.script[index].clone()
    }

    fn transport_name(&self) -> &'static str {
        "scripted"
    }
}

/// A successful lookup of `@elonmusk` with the given display name
pub fn found(name: &str) -> Result<LookupResponse, TransportError> {
    Ok(LookupResponse::Found(Profile::new(name, "elonmusk")))
}

/// A 429 answer without a reset header
pub fn rate_limited() -> Result<LookupResponse, TransportError> {
    Ok(LookupResponse::RateLimited { reset_at: None })
}

/// A 500 answer
pub fn server_error() -> Result<LookupResponse, TransportError> {
    Err(TransportError::Status {
        status: 500,
        body: "Internal Server Error".to_string(),
    })
}

/// A sink that always fails and counts attempts
pub struct FailingSink {
    attempts: Arc<AtomicUsize>,
}

impl FailingSink {
    pub fn new() -> Self {
        Self {
            attempts: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.attempts)
    }
}

#[async_trait::async_trait]
impl NotificationSink for FailingSink {
    async fn send(&self, _subject: &str, _body: &str) -> Result<(), SendError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(SendError::Transport("SMTP connection refused".to_string()))
    }

    fn sink_name(&self) -> &'static str {
        "failing"
    }
}

/// A sink that records subjects in order
#[derive(Clone, Default)]
pub struct SubjectLog {
    subjects: Arc<Mutex<Vec<String>>>,
}

impl SubjectLog {
    pub fn subjects(&self) -> Vec<String> {
        self.subjects.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl NotificationSink for SubjectLog {
    async fn send(&self, subject: &str, _body: &str) -> Result<(), SendError> {
        self.subjects.lock().unwrap().push(subject.to_string());
        Ok(())
    }

    fn sink_name(&self) -> &'static str {
        "subject-log"
    }
}

/// Helper to create a minimal WatchConfig for testing
///
/// Backoff has no jitter and a one second base; tests that hit it run on a
/// paused clock.
pub fn minimal_config() -> WatchConfig {
    let mut config = WatchConfig::new("elonmusk");
    config.poll.interval_secs = 600;
    config.poll.event_channel_capacity = 100;
    config.retry.backoff_base_secs = 1;
    config.retry.max_jitter_millis = 0;
    config
}
