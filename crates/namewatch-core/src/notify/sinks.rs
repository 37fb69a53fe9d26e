// # Built-in Notification Sinks
//
// ## DisabledSink
//
// Used when email credentials are incomplete. Every send is a logged no-op so
// the poll loop keeps running without notifications.
//
// ## MemorySink
//
// Records every message in memory. Useful for embedding and tests; the
// recorded list is shared between clones.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::warn;

use crate::error::SendError;
use crate::traits::NotificationSink;

/// Sink that drops every message with a warning
#[derive(Debug, Clone, Default)]
pub struct DisabledSink {
    reason: String,
}

impl DisabledSink {
    /// Create a disabled sink, remembering why it is disabled
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl NotificationSink for DisabledSink {
    async fn send(&self, subject: &str, _body: &str) -> Result<(), SendError> {
        warn!(
            "Notifications disabled ({}), skipping: {}",
            self.reason, subject
        );
        Ok(())
    }

    fn sink_name(&self) -> &'static str {
        "disabled"
    }
}

/// A message captured by [`MemorySink`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub subject: String,
    pub body: String,
}

/// Sink that records messages in memory
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    sent: Arc<Mutex<Vec<SentMessage>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All messages sent so far, oldest first
    pub fn messages(&self) -> Vec<SentMessage> {
        self.sent
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_default()
    }

    /// Number of messages sent so far
    pub fn len(&self) -> usize {
        self.sent.lock().map(|sent| sent.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl NotificationSink for MemorySink {
    async fn send(&self, subject: &str, body: &str) -> Result<(), SendError> {
        let mut sent = self
            .sent
            .lock()
            .map_err(|_| SendError::Transport("memory sink poisoned".to_string()))?;
        sent.push(SentMessage {
            subject: subject.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }

    fn sink_name(&self) -> &'static str {
        "memory"
    }
}
