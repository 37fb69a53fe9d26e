//! Notification policy
//!
//! The [`NotificationDispatcher`] turns a [`Classification`] into at most one
//! message per cycle:
//!
//! | mode                 | Changed | Unchanged                         | FirstObservation |
//! |----------------------|---------|-----------------------------------|------------------|
//! | `ChangeOnly`         | notify  | -                                 | -                |
//! | `ChangeOrReminder`   | notify  | remind if interval has elapsed    | -                |
//!
//! A reminder resets the reminder clock, so while the name stays the same a
//! reminder fires at most once per `reminder_interval`.
//!
//! Delivery failures are logged and reported in the returned
//! [`NotificationAction`]; they never propagate into the poll loop.

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::config::{NotifyConfig, NotifyMode};
use crate::detector::Classification;
use crate::traits::{NotificationSink, Profile};

/// Footer appended to change notifications
const STATUS_CHANGED: &str = "Status: Name Updated! 🟢";

/// Footer appended to reminders
const STATUS_UNCHANGED: &str = "Status: No Name Change Detected. 🔴";

/// What kind of message was emitted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    /// The display name changed
    Change,
    /// Periodic "still unchanged" reminder
    Reminder,
}

/// Result of [`NotificationDispatcher::maybe_notify`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationAction {
    /// Policy decided not to notify
    None,
    /// A message was handed to the sink successfully
    Sent(NotificationKind),
    /// A message was due but the sink failed
    Failed(NotificationKind),
}

/// A composed message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub subject: String,
    pub body: String,
}

impl Notification {
    /// Compose a change notification
    pub fn change(handle: &str, previous: &str, current: &str, at: DateTime<Utc>) -> Self {
        Self {
            kind: NotificationKind::Change,
            subject: format!("Name Change Alert for @{}", handle),
            body: format!(
                "@{} changed their display name from '{}' to '{}' at {}\n\n{}",
                handle,
                previous,
                current,
                format_time(at),
                STATUS_CHANGED
            ),
        }
    }

    /// Compose a "still unchanged" reminder
    pub fn reminder(handle: &str, current: &str, at: DateTime<Utc>) -> Self {
        Self {
            kind: NotificationKind::Reminder,
            subject: format!("No Change in Name for @{}", handle),
            body: format!(
                "@{} has not changed their display name since the last check at {}.\n\
                 Current display name: '{}'\n\n{}",
                handle,
                format_time(at),
                current,
                STATUS_UNCHANGED
            ),
        }
    }
}

fn format_time(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %I:%M:%S %p UTC").to_string()
}

/// Reminder bookkeeping, owned by the dispatcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationState {
    /// When the last change notification was emitted
    pub last_change_at: Option<DateTime<Utc>>,
    /// When any notification was last emitted
    pub last_notified_at: DateTime<Utc>,
}

/// Decides when to notify and delivers through a [`NotificationSink`]
pub struct NotificationDispatcher {
    sink: Box<dyn NotificationSink>,
    mode: NotifyMode,
    reminder_interval: chrono::Duration,
    state: NotificationState,
}

impl NotificationDispatcher {
    /// Create a dispatcher
    ///
    /// `started_at` seeds `last_notified_at`, so the first reminder is due one
    /// full interval after start.
    pub fn new(
        sink: Box<dyn NotificationSink>,
        config: &NotifyConfig,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            sink,
            mode: config.mode,
            reminder_interval: i64::try_from(config.reminder_interval_secs)
                .ok()
                .and_then(chrono::Duration::try_seconds)
                .unwrap_or(chrono::Duration::MAX),
            state: NotificationState {
                last_change_at: None,
                last_notified_at: started_at,
            },
        }
    }

    /// Decide whether this observation warrants a message and send it
    pub async fn maybe_notify(
        &mut self,
        classification: &Classification,
        profile: &Profile,
        now: DateTime<Utc>,
    ) -> NotificationAction {
        let Some(notification) = self.compose(classification, profile, now) else {
            return NotificationAction::None;
        };

        // The attempt counts as an emission even if delivery fails
        self.state.last_notified_at = now;
        if notification.kind == NotificationKind::Change {
            self.state.last_change_at = Some(now);
        }

        match self
            .sink
            .send(&notification.subject, &notification.body)
            .await
        {
            Ok(()) => {
                info!(
                    "Sent {:?} notification via {}: {}",
                    notification.kind,
                    self.sink.sink_name(),
                    notification.subject
                );
                NotificationAction::Sent(notification.kind)
            }
            Err(e) => {
                warn!(
                    "Failed to send {:?} notification via {}: {}",
                    notification.kind,
                    self.sink.sink_name(),
                    e
                );
                NotificationAction::Failed(notification.kind)
            }
        }
    }

    /// Current reminder bookkeeping
    pub fn state(&self) -> &NotificationState {
        &self.state
    }

    fn compose(
        &self,
        classification: &Classification,
        profile: &Profile,
        now: DateTime<Utc>,
    ) -> Option<Notification> {
        match classification {
            Classification::FirstObservation => None,
            Classification::Changed { previous } => Some(Notification::change(
                &profile.handle,
                previous,
                &profile.name,
                now,
            )),
            Classification::Unchanged => match self.mode {
                NotifyMode::ChangeOnly => None,
                NotifyMode::ChangeOrReminder => {
                    let since = now.signed_duration_since(self.state.last_notified_at);
                    (since >= self.reminder_interval)
                        .then(|| Notification::reminder(&profile.handle, &profile.name, now))
                }
            },
        }
    }
}
