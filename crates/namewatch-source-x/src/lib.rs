// # X User Lookup Transport
//
// This crate provides a `ProfileTransport` backed by the X (formerly Twitter)
// API v2 user lookup endpoint.
//
// ## Behavior
//
// - Makes exactly one HTTP request per `lookup()` call
// - Maps 200 to `LookupResponse::Found`, 429 to `LookupResponse::RateLimited`
// - Maps every other status, network failure, or unreadable body to a `TransportError`
// - NO retry, backoff, or quota tracking (owned by `RemoteClient` in namewatch-core)
//
// ## Security Requirements
//
// - Bearer token NEVER appears in logs or `Debug` output
// - Construction fails fast if the token is empty
//
// ## API Reference
//
// - User lookup: GET `/2/users/by/username/:username`
// - Rate limit reset header: `x-rate-limit-reset` (unix seconds)

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use namewatch_core::error::TransportError;
use namewatch_core::traits::{LookupResponse, Profile, ProfileTransport};
use namewatch_core::{Error, Result};
use serde::Deserialize;
use std::time::Duration;

/// X API v2 base URL
pub const DEFAULT_API_BASE: &str = "https://api.twitter.com/2";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Header carrying the quota reset time on 429 answers
const RATE_LIMIT_RESET_HEADER: &str = "x-rate-limit-reset";

/// Longest error body kept in a `TransportError`
const MAX_ERROR_BODY_CHARS: usize = 512;

/// Successful user lookup body
#[derive(Debug, Deserialize)]
struct UserLookup {
    data: Option<UserData>,
    #[serde(default)]
    errors: Vec<ApiError>,
}

#[derive(Debug, Deserialize)]
struct UserData {
    name: String,
    username: String,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    detail: Option<String>,
    #[serde(default)]
    title: Option<String>,
}

// Custom Debug implementation that hides the bearer token
impl std::fmt::Debug for XUserTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("XUserTransport")
            .field("bearer_token", &"<REDACTED>")
            .field("api_base", &self.api_base)
            .finish()
    }
}

/// X API v2 user lookup transport
pub struct XUserTransport {
    /// App-only bearer token
    /// ⚠️ NEVER log this value
    bearer_token: String,

    /// API base URL without trailing slash
    api_base: String,

    /// HTTP client for API requests
    client: reqwest::Client,
}

impl XUserTransport {
    /// Create a new transport
    ///
    /// # Parameters
    ///
    /// - `bearer_token`: App-only bearer token
    /// - `api_base`: API base URL; `None` uses [`DEFAULT_API_BASE`]
    ///
    /// # Errors
    ///
    /// - `Error::Config` if the token is empty
    /// - `Error::Http` if the HTTP client cannot be built
    pub fn new(bearer_token: impl Into<String>, api_base: Option<String>) -> Result<Self> {
        let bearer_token = bearer_token.into();
        if bearer_token.trim().is_empty() {
            return Err(Error::config("X API bearer token cannot be empty"));
        }

        let api_base = api_base
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string())
            .trim_end_matches('/')
            .to_string();

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            bearer_token,
            api_base,
            client,
        })
    }

    fn lookup_url(&self, handle: &str) -> String {
        format!("{}/users/by/username/{}", self.api_base, handle)
    }
}

#[async_trait]
impl ProfileTransport for XUserTransport {
    async fn lookup(&self, handle: &str) -> std::result::Result<LookupResponse, TransportError> {
        let url = self.lookup_url(handle);
        tracing::debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.bearer_token)
            .send()
            .await
            .map_err(|e| TransportError::Network(format!("HTTP request failed: {}", e)))?;

        let status = response.status().as_u16();
        let reset_header = response
            .headers()
            .get(RATE_LIMIT_RESET_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        let body = response
            .text()
            .await
            .map_err(|e| TransportError::Network(format!("Failed to read response: {}", e)))?;

        classify_response(status, reset_header.as_deref(), &body)
    }

    fn transport_name(&self) -> &'static str {
        "x-api-v2"
    }
}

/// Map a raw HTTP answer onto the transport contract
///
/// - 200 with `data` -> `Found`
/// - 200 without `data` (e.g. unknown user) -> `Malformed`
/// - 429 -> `RateLimited`, with the reset time if the header parses
/// - anything else -> `Status`
pub fn classify_response(
    status: u16,
    reset_header: Option<&str>,
    body: &str,
) -> std::result::Result<LookupResponse, TransportError> {
    match status {
        200 => {
            let lookup: UserLookup = serde_json::from_str(body)
                .map_err(|e| TransportError::Malformed(format!("Invalid JSON body: {}", e)))?;

            match lookup.data {
                Some(user) => Ok(LookupResponse::Found(Profile::new(
                    user.name,
                    user.username,
                ))),
                None => {
                    let reason = lookup
                        .errors
                        .first()
                        .and_then(|e| e.detail.clone().or_else(|| e.title.clone()))
                        .unwrap_or_else(|| "response has no data".to_string());
                    Err(TransportError::Malformed(reason))
                }
            }
        }
        429 => Ok(LookupResponse::RateLimited {
            reset_at: reset_header.and_then(parse_reset),
        }),
        _ => Err(TransportError::Status {
            status,
            body: truncate(body),
        }),
    }
}

fn parse_reset(value: &str) -> Option<DateTime<Utc>> {
    let secs: i64 = value.trim().parse().ok()?;
    DateTime::from_timestamp(secs, 0)
}

fn truncate(body: &str) -> String {
    body.chars().take(MAX_ERROR_BODY_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_body_parses() {
        let body = r#"{"data":{"id":"44196397","name":"Kekius Maximus","username":"elonmusk"}}"#;

        let response = classify_response(200, None, body).unwrap();
        assert_eq!(
            response,
            LookupResponse::Found(Profile::new("Kekius Maximus", "elonmusk"))
        );
    }

    #[test]
    fn test_rate_limit_with_reset_header() {
        let response = classify_response(429, Some("1735732800"), "Too Many Requests").unwrap();

        assert_eq!(
            response,
            LookupResponse::RateLimited {
                reset_at: DateTime::from_timestamp(1_735_732_800, 0),
            }
        );
    }

    #[test]
    fn test_rate_limit_with_bad_or_missing_header() {
        for header in [None, Some("soon"), Some("")] {
            assert_eq!(
                classify_response(429, header, "").unwrap(),
                LookupResponse::RateLimited { reset_at: None }
            );
        }
    }

    #[test]
    fn test_other_status_is_error() {
        let err = classify_response(503, None, "Service Unavailable").unwrap_err();
        assert_eq!(
            err,
            TransportError::Status {
                status: 503,
                body: "Service Unavailable".to_string()
            }
        );

        assert!(matches!(
            classify_response(401, None, "Unauthorized"),
            Err(TransportError::Status { status: 401, .. })
        ));
    }

    #[test]
    fn test_unknown_user_is_malformed() {
        let body = r#"{"errors":[{"title":"Not Found Error","detail":"Could not find user with username: [nobody_here]."}]}"#;

        let err = classify_response(200, None, body).unwrap_err();
        assert_eq!(
            err,
            TransportError::Malformed(
                "Could not find user with username: [nobody_here].".to_string()
            )
        );
    }

    #[test]
    fn test_invalid_json_is_malformed() {
        assert!(matches!(
            classify_response(200, None, "<html>"),
            Err(TransportError::Malformed(_))
        ));
    }

    #[test]
    fn test_error_body_is_truncated() {
        let body = "x".repeat(2_000);
        match classify_response(500, None, &body) {
            Err(TransportError::Status { body, .. }) => {
                assert_eq!(body.len(), MAX_ERROR_BODY_CHARS)
            }
            other => panic!("expected status error, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_token_rejected() {
        assert!(matches!(
            XUserTransport::new("  ", None),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_lookup_url() {
        let transport =
            XUserTransport::new("token", Some("http://localhost:8080/2/".to_string())).unwrap();
        assert_eq!(
            transport.lookup_url("elonmusk"),
            "http://localhost:8080/2/users/by/username/elonmusk"
        );
    }

    #[test]
    fn test_bearer_token_not_exposed_in_debug() {
        let transport = XUserTransport::new("secret_token_12345", None).unwrap();

        let debug_str = format!("{:?}", transport);
        assert!(!debug_str.contains("secret_token"));
        assert!(debug_str.contains("XUserTransport"));
        assert!(debug_str.contains(DEFAULT_API_BASE));
    }
}
