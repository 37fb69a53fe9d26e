//! Trailing-window request budget
//!
//! The [`RateLimiter`] remembers when recent remote calls were made and tells
//! the caller how long to pause before the next one so that no more than
//! `threshold` calls fall inside any `window`.
//!
//! Entries older than the window are purged before every capacity check, so
//! the recorded sequence never holds timestamps outside the window at the time
//! it is inspected.

use std::collections::VecDeque;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::config::RateLimitConfig;

/// Sliding-window call tracker
///
/// Owned by a single [`RemoteClient`](crate::client::RemoteClient); not shared
/// across tasks.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    window: chrono::Duration,
    threshold: usize,
    calls: VecDeque<DateTime<Utc>>,
}

impl RateLimiter {
    /// Create a limiter allowing `threshold` calls per `window`
    pub fn new(window: Duration, threshold: usize) -> Self {
        Self {
            window: chrono::Duration::from_std(window).unwrap_or(chrono::Duration::MAX),
            threshold,
            calls: VecDeque::new(),
        }
    }

    /// Create a limiter from configuration
    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(Duration::from_secs(config.window_secs), config.threshold)
    }

    /// How long the caller must pause before issuing another call at `now`
    ///
    /// Returns zero while the window has spare capacity. Otherwise returns the
    /// time until the oldest call leaves the window.
    pub fn should_wait(&mut self, now: DateTime<Utc>) -> Duration {
        self.purge(now);

        if self.calls.len() < self.threshold {
            return Duration::ZERO;
        }

        let Some(oldest) = self.calls.front() else {
            return Duration::ZERO;
        };

        let wait = match oldest.checked_add_signed(self.window) {
            Some(leaves_at) => (leaves_at - now).to_std().unwrap_or(Duration::ZERO),
            None => Duration::MAX,
        };

        debug!(
            "Rate window full ({} calls >= {}), waiting {:?}",
            self.calls.len(),
            self.threshold,
            wait
        );

        wait
    }

    /// Record a call made at `now`
    pub fn record_call(&mut self, now: DateTime<Utc>) {
        self.calls.push_back(now);
    }

    /// Number of calls inside the window at `now`
    pub fn calls_in_window(&mut self, now: DateTime<Utc>) -> usize {
        self.purge(now);
        self.calls.len()
    }

    fn purge(&mut self, now: DateTime<Utc>) {
        while let Some(oldest) = self.calls.front() {
            if now.signed_duration_since(*oldest) >= self.window {
                self.calls.pop_front();
            } else {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t0() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    #[test]
    fn test_empty_window_never_waits() {
        let mut limiter = RateLimiter::new(Duration::from_secs(900), 400);
        assert_eq!(limiter.should_wait(t0()), Duration::ZERO);
    }

    #[test]
    fn test_full_window_waits_until_oldest_expires() {
        let mut limiter = RateLimiter::new(Duration::from_secs(900), 400);

        // 400 calls spread across one second
        for i in 0..400 {
            limiter.record_call(t0() + chrono::Duration::microseconds(i * 2_500));
        }

        let now = t0() + chrono::Duration::seconds(1);
        let wait = limiter.should_wait(now);
        assert!(wait > Duration::ZERO);
        assert!(wait <= Duration::from_secs(900));
        assert_eq!(wait, Duration::from_secs(899));

        let later = now + chrono::Duration::seconds(901);
        assert_eq!(limiter.should_wait(later), Duration::ZERO);
        assert_eq!(limiter.calls_in_window(later), 0);
    }

    #[test]
    fn test_below_threshold_does_not_wait() {
        let mut limiter = RateLimiter::new(Duration::from_secs(900), 3);
        limiter.record_call(t0());
        limiter.record_call(t0());

        assert_eq!(limiter.should_wait(t0()), Duration::ZERO);

        limiter.record_call(t0());
        assert_eq!(limiter.should_wait(t0()), Duration::from_secs(900));
    }

    #[test]
    fn test_purge_drops_only_expired_entries() {
        let mut limiter = RateLimiter::new(Duration::from_secs(10), 100);
        limiter.record_call(t0());
        limiter.record_call(t0() + chrono::Duration::seconds(5));
        limiter.record_call(t0() + chrono::Duration::seconds(9));

        assert_eq!(limiter.calls_in_window(t0() + chrono::Duration::seconds(10)), 2);
        assert_eq!(limiter.calls_in_window(t0() + chrono::Duration::seconds(15)), 1);
    }

    #[test]
    fn test_entry_leaves_window_at_boundary() {
        let mut limiter = RateLimiter::new(Duration::from_secs(10), 1);
        limiter.record_call(t0() + chrono::Duration::seconds(30));

        assert_eq!(limiter.should_wait(t0()), Duration::from_secs(40));
        assert_eq!(
            limiter.should_wait(t0() + chrono::Duration::seconds(39)),
            Duration::from_secs(1)
        );
        assert_eq!(
            limiter.should_wait(t0() + chrono::Duration::seconds(40)),
            Duration::ZERO
        );
    }
}
