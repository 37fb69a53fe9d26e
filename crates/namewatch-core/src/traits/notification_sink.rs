// # Notification Sink Trait
//
// Defines the interface for delivering notifications.
//
// ## Implementations
//
// - SMTP: `namewatch-notify-smtp` crate
// - [`DisabledSink`](crate::notify::DisabledSink): no credentials configured
// - [`MemorySink`](crate::notify::MemorySink): records messages in memory

use async_trait::async_trait;

use crate::error::SendError;

/// Trait for notification sink implementations
///
/// Sinks deliver one message per call and report failure through
/// [`SendError`]. The dispatcher logs failures and carries on; a sink must not
/// retry internally.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Deliver a message
    async fn send(&self, subject: &str, body: &str) -> Result<(), SendError>;

    /// Get the sink name (for logging/debugging)
    fn sink_name(&self) -> &'static str;
}
