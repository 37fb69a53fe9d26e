// # Notifications
//
// This module decides when to notify and provides the built-in sinks.
//
// - `dispatcher`: change/reminder policy and message composition
// - `sinks`: `DisabledSink` (no credentials) and `MemorySink` (recording)

pub mod dispatcher;
pub mod sinks;

pub use dispatcher::{
    Notification, NotificationAction, NotificationDispatcher, NotificationKind, NotificationState,
};
pub use sinks::{DisabledSink, MemorySink, SentMessage};
