//! Configuration types for the namewatch system
//!
//! This module defines all configuration structures used throughout the crate.
//! The daemon builds a [`WatchConfig`] once at startup; nothing here is
//! reloaded at runtime.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// Longest accepted rate window (one day)
pub const MAX_WINDOW_SECS: u64 = 86_400;

/// Longest accepted backoff base and reset buffer (one hour)
pub const MAX_RETRY_DELAY_SECS: u64 = 3_600;

/// Longest accepted reminder interval (30 days)
pub const MAX_REMINDER_INTERVAL_SECS: u64 = 30 * 86_400;

/// Main namewatch configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// The account being tracked
    pub target: TargetConfig,

    /// Poll loop settings
    #[serde(default)]
    pub poll: PollConfig,

    /// Trailing-window request budget
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Retry policy for rate-limit answers
    #[serde(default)]
    pub retry: RetryConfig,

    /// Notification policy
    #[serde(default)]
    pub notify: NotifyConfig,
}

impl WatchConfig {
    /// Create a configuration tracking `handle` with default settings
    pub fn new(handle: impl Into<String>) -> Self {
        Self {
            target: TargetConfig {
                handle: handle.into(),
            },
            poll: PollConfig::default(),
            rate_limit: RateLimitConfig::default(),
            retry: RetryConfig::default(),
            notify: NotifyConfig::default(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.target.validate()?;

        if self.poll.interval_secs == 0 {
            return Err(crate::Error::config("Poll interval must be > 0"));
        }
        if self.poll.event_channel_capacity == 0 {
            return Err(crate::Error::config("Event channel capacity must be > 0"));
        }

        if !(1..=MAX_WINDOW_SECS).contains(&self.rate_limit.window_secs) {
            return Err(crate::Error::config(format!(
                "Rate limit window must be between 1 and {} seconds, got {}",
                MAX_WINDOW_SECS, self.rate_limit.window_secs
            )));
        }
        if self.rate_limit.threshold == 0 {
            return Err(crate::Error::config("Rate limit threshold must be > 0"));
        }

        if self.retry.max_retries > 10 {
            return Err(crate::Error::config(format!(
                "Max retries must be at most 10, got {}",
                self.retry.max_retries
            )));
        }

        if self.retry.backoff_base_secs > MAX_RETRY_DELAY_SECS {
            return Err(crate::Error::config(format!(
                "Backoff base must be at most {} seconds, got {}",
                MAX_RETRY_DELAY_SECS, self.retry.backoff_base_secs
            )));
        }
        if self.retry.reset_buffer_secs > MAX_RETRY_DELAY_SECS {
            return Err(crate::Error::config(format!(
                "Reset buffer must be at most {} seconds, got {}",
                MAX_RETRY_DELAY_SECS, self.retry.reset_buffer_secs
            )));
        }

        if self.notify.mode == NotifyMode::ChangeOrReminder
            && self.notify.reminder_interval_secs == 0
        {
            return Err(crate::Error::config(
                "Reminder interval must be > 0 in change-or-reminder mode",
            ));
        }
        if self.notify.reminder_interval_secs > MAX_REMINDER_INTERVAL_SECS {
            return Err(crate::Error::config(format!(
                "Reminder interval must be at most {} seconds, got {}",
                MAX_REMINDER_INTERVAL_SECS, self.notify.reminder_interval_secs
            )));
        }

        Ok(())
    }
}

/// The tracked account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    /// Account handle without the leading `@`
    pub handle: String,
}

impl TargetConfig {
    /// Validate the handle
    ///
    /// Handles are 1-15 characters of ASCII letters, digits and underscores.
    pub fn validate(&self) -> Result<(), crate::Error> {
        let handle = &self.handle;

        if handle.is_empty() {
            return Err(crate::Error::config("Tracked handle cannot be empty"));
        }

        if handle.starts_with('@') {
            return Err(crate::Error::config(format!(
                "Tracked handle must not include '@': {}",
                handle
            )));
        }

        if handle.len() > 15 {
            return Err(crate::Error::config(format!(
                "Tracked handle too long: {} chars (max 15)",
                handle.len()
            )));
        }

        if !handle.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(crate::Error::config(format!(
                "Tracked handle contains invalid characters: {}",
                handle
            )));
        }

        Ok(())
    }
}

/// Poll loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollConfig {
    /// Delay between cycles (in seconds), independent of rate-limit waits
    #[serde(default = "default_poll_interval_secs")]
    pub interval_secs: u64,

    /// Capacity of the observer event channel
    ///
    /// When full, new events are dropped (with a warning log).
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl PollConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_poll_interval_secs(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

/// Trailing-window request budget
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Window length (in seconds)
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,

    /// Number of calls allowed inside one window before the client waits
    #[serde(default = "default_threshold")]
    pub threshold: usize,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_secs: default_window_secs(),
            threshold: default_threshold(),
        }
    }
}

/// Retry policy applied to explicit rate-limit answers only
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Retries after the first request; total requests are `max_retries + 1`
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base of the exponential backoff (in seconds) when no reset time is given
    #[serde(default = "default_backoff_base_secs")]
    pub backoff_base_secs: u64,

    /// Extra seconds added on top of a server-provided reset time
    #[serde(default = "default_reset_buffer_secs")]
    pub reset_buffer_secs: u64,

    /// Upper bound of the random jitter added to exponential backoff (in milliseconds)
    #[serde(default = "default_max_jitter_millis")]
    pub max_jitter_millis: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            backoff_base_secs: default_backoff_base_secs(),
            reset_buffer_secs: default_reset_buffer_secs(),
            max_jitter_millis: default_max_jitter_millis(),
        }
    }
}

/// Notification policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// When to emit notifications
    #[serde(default)]
    pub mode: NotifyMode,

    /// Minimum time between "still unchanged" reminders (in seconds)
    #[serde(default = "default_reminder_interval_secs")]
    pub reminder_interval_secs: u64,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            mode: NotifyMode::default(),
            reminder_interval_secs: default_reminder_interval_secs(),
        }
    }
}

/// Notification mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NotifyMode {
    /// Notify only when the display name changes
    ChangeOnly,
    /// Notify on change, and remind periodically while unchanged
    #[default]
    ChangeOrReminder,
}

impl FromStr for NotifyMode {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "change-only" | "change_only" => Ok(NotifyMode::ChangeOnly),
            "change-or-reminder" | "change_or_reminder" => Ok(NotifyMode::ChangeOrReminder),
            other => Err(crate::Error::config(format!(
                "Unknown notification mode '{}'. Valid modes: change-only, change-or-reminder",
                other
            ))),
        }
    }
}

fn default_poll_interval_secs() -> u64 {
    600
}

fn default_event_channel_capacity() -> usize {
    1000
}

fn default_window_secs() -> u64 {
    900
}

fn default_threshold() -> usize {
    400
}

fn default_max_retries() -> u32 {
    5
}

fn default_backoff_base_secs() -> u64 {
    2
}

fn default_reset_buffer_secs() -> u64 {
    5
}

fn default_max_jitter_millis() -> u64 {
    1000
}

fn default_reminder_interval_secs() -> u64 {
    3600
}
