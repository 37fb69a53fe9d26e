//! Rate-limit aware remote client
//!
//! [`RemoteClient`] wraps a single-shot [`ProfileTransport`] with the policy
//! the transport is not allowed to own:
//!
//! 1. Before each attempt, ask the [`RateLimiter`] whether to pause
//! 2. Issue one lookup
//! 3. On success, record the call and return the profile
//! 4. On a rate-limit answer, sleep until the server's reset time (plus a
//!    buffer) or for an exponential backoff, then retry
//! 5. On anything else, give up immediately
//!
//! A server reset time further away than [`MAX_RESET_WAIT`] is treated as
//! bogus and the wait is capped.
//!
//! Retries form a bounded loop with an explicit attempt counter. Once
//! `max_retries` retries have been answered with rate-limit signals the fetch
//! fails with [`FetchError::RateLimited`].

use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::Rng;
use tracing::{debug, info, warn};

use crate::config::{RateLimitConfig, RetryConfig};
use crate::error::FetchError;
use crate::rate_limit::RateLimiter;
use crate::traits::{LookupResponse, Profile, ProfileTransport};

/// Longest wait honoured for a server-provided reset time
pub const MAX_RESET_WAIT: Duration = Duration::from_secs(3_600);

/// Remote lookup client with rate-window bookkeeping and bounded retry
pub struct RemoteClient {
    /// Single-shot transport
    transport: Box<dyn ProfileTransport>,

    /// Calls made within the trailing window
    limiter: RateLimiter,

    /// Retry policy for rate-limit answers
    retry: RetryConfig,
}

impl RemoteClient {
    /// Create a new client
    pub fn new(
        transport: Box<dyn ProfileTransport>,
        rate_limit: &RateLimitConfig,
        retry: RetryConfig,
    ) -> Self {
        Self {
            transport,
            limiter: RateLimiter::from_config(rate_limit),
            retry,
        }
    }

    /// Fetch the current profile for `handle`
    ///
    /// # Returns
    ///
    /// - `Ok(Profile)`: The lookup succeeded
    /// - `Err(FetchError::RateLimited)`: Retries exhausted on rate-limit answers
    /// - `Err(FetchError::Unavailable)`: Network or protocol failure (not retried)
    pub async fn fetch(&mut self, handle: &str) -> Result<Profile, FetchError> {
        let mut attempt: u32 = 0;

        loop {
            let wait = self.limiter.should_wait(Utc::now());
            if !wait.is_zero() {
                info!(
                    "Rate window exhausted, pausing {:?} before next lookup",
                    wait
                );
                tokio::time::sleep(wait).await;
            }

            debug!(
                "Looking up @{} via {} (attempt {})",
                handle,
                self.transport.transport_name(),
                attempt + 1
            );

            match self.transport.lookup(handle).await {
                Ok(LookupResponse::Found(profile)) => {
                    self.limiter.record_call(Utc::now());
                    return Ok(profile);
                }
                Ok(LookupResponse::RateLimited { reset_at }) => {
                    // A 429 still counts against the remote quota
                    self.limiter.record_call(Utc::now());

                    if attempt >= self.retry.max_retries {
                        warn!(
                            "Rate limited on @{} after {} attempt(s), giving up",
                            handle,
                            attempt + 1
                        );
                        return Err(FetchError::RateLimited {
                            attempts: attempt + 1,
                        });
                    }

                    let delay = self.retry_delay(attempt, reset_at, Utc::now(), self.jitter());
                    warn!(
                        "Rate limit exceeded for @{}, sleeping {:?} before retry {}/{}",
                        handle,
                        delay,
                        attempt + 1,
                        self.retry.max_retries
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    warn!("Lookup of @{} failed: {}", handle, e);
                    return Err(FetchError::Unavailable(e));
                }
            }
        }
    }

    /// Current rate window
    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// Delay before retry number `attempt + 1`
    ///
    /// With a server reset time: `max(0, reset - now + buffer)`, capped at
    /// [`MAX_RESET_WAIT`].
    /// Without one: `base * 2^attempt + jitter`.
    pub(crate) fn retry_delay(
        &self,
        attempt: u32,
        reset_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
        jitter: Duration,
    ) -> Duration {
        match reset_at {
            Some(reset_at) => {
                let buffer = i64::try_from(self.retry.reset_buffer_secs)
                    .ok()
                    .and_then(chrono::Duration::try_seconds)
                    .unwrap_or(chrono::Duration::MAX);

                let delay = match reset_at.checked_add_signed(buffer) {
                    Some(resume_at) => (resume_at - now).to_std().unwrap_or(Duration::ZERO),
                    None => Duration::MAX,
                };

                if delay > MAX_RESET_WAIT {
                    warn!(
                        "Rate limit reset at {} is {:?} away, capping wait at {:?}",
                        reset_at, delay, MAX_RESET_WAIT
                    );
                    return MAX_RESET_WAIT;
                }
                delay
            }
            None => {
                let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
                let backoff = self.retry.backoff_base_secs.saturating_mul(factor);
                Duration::from_secs(backoff).saturating_add(jitter)
            }
        }
    }

    fn jitter(&self) -> Duration {
        let millis = rand::thread_rng().gen_range(0..=self.retry.max_jitter_millis);
        Duration::from_millis(millis)
    }
}
