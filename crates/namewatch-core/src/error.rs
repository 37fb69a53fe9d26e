//! Error types for the namewatch system
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

/// Result type alias for namewatch operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the namewatch system
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration errors (fatal at startup)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Profile fetch failed
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Notification delivery failed
    #[error("Notification error: {0}")]
    Send(#[from] SendError),

    /// JSON (de)serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP client construction errors
    #[error("HTTP error: {0}")]
    Http(String),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an HTTP error
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}

/// Failure of a single single-shot transport call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The request never produced a response
    #[error("network error: {0}")]
    Network(String),

    /// The remote answered with a status other than success or rate limit
    #[error("unexpected status {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body (possibly truncated)
        body: String,
    },

    /// A success response whose body could not be understood
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Outcome of a failed `RemoteClient::fetch`
#[derive(Error, Debug)]
pub enum FetchError {
    /// The remote kept answering with rate-limit signals until retries ran out
    #[error("rate limited after {attempts} attempt(s)")]
    RateLimited {
        /// Total number of requests issued, including the first one
        attempts: u32,
    },

    /// Network or protocol failure; never retried
    #[error("remote service unavailable: {0}")]
    Unavailable(#[source] TransportError),
}

/// Failure to deliver a notification
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SendError {
    /// The message could not be built (bad address, bad header)
    #[error("invalid message: {0}")]
    Message(String),

    /// The transport rejected or failed to deliver the message
    #[error("transport failure: {0}")]
    Transport(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_keeps_cause() {
        let err = FetchError::Unavailable(TransportError::Status {
            status: 500,
            body: "boom".to_string(),
        });

        let source = std::error::Error::source(&err).map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("unexpected status 500: boom"));
    }

    #[test]
    fn test_fetch_error_converts_into_core_error() {
        let err: Error = FetchError::RateLimited { attempts: 6 }.into();
        assert_eq!(err.to_string(), "Fetch error: rate limited after 6 attempt(s)");
    }

    #[test]
    fn test_json_error_conversion() {
        fn parse(raw: &str) -> Result<crate::config::WatchConfig> {
            Ok(serde_json::from_str(raw)?)
        }

        assert!(matches!(parse("{ not json"), Err(Error::Json(_))));
        assert!(parse(r#"{ "target": { "handle": "jack" } }"#).is_ok());
    }
}
