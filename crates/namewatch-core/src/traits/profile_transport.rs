// # Profile Transport Trait
//
// Defines the interface for looking up the tracked account on the remote service.
//
// ## Implementations
//
// - X API v2: `namewatch-source-x` crate
//
// ## Usage
//
// ```rust,ignore
// use namewatch_core::ProfileTransport;
//
// let transport = /* ProfileTransport implementation */;
// match transport.lookup("elonmusk").await? {
//     LookupResponse::Found(profile) => println!("{}", profile.name),
//     LookupResponse::RateLimited { reset_at } => println!("wait until {:?}", reset_at),
// }
// ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TransportError;

/// The observed attributes of the tracked account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Display name (the mutable attribute being watched)
    pub name: String,
    /// Account handle as reported by the remote service
    pub handle: String,
}

impl Profile {
    pub fn new(name: impl Into<String>, handle: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            handle: handle.into(),
        }
    }
}

/// A lookup that reached the remote service and was understood
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupResponse {
    /// Success: the profile as currently published
    Found(Profile),
    /// Explicit rate-limit signal (HTTP 429)
    RateLimited {
        /// When the remote quota resets, if the server said so
        reset_at: Option<DateTime<Utc>>,
    },
}

/// Trait for remote profile lookup implementations
///
/// A transport performs exactly one request per call. It does not sleep,
/// retry, or track quota: all of that is owned by
/// [`RemoteClient`](crate::client::RemoteClient).
///
/// # Thread Safety
///
/// Implementations must be thread-safe and usable across async tasks.
#[async_trait]
pub trait ProfileTransport: Send + Sync {
    /// Look up `handle` once
    ///
    /// # Returns
    ///
    /// - `Ok(LookupResponse::Found)`: The current profile
    /// - `Ok(LookupResponse::RateLimited)`: The remote asked us to slow down
    /// - `Err(TransportError)`: Network failure or any other status
    async fn lookup(&self, handle: &str) -> Result<LookupResponse, TransportError>;

    /// Get the transport name (for logging/debugging)
    fn transport_name(&self) -> &'static str;
}
