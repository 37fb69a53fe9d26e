// # Daemon Configuration
//
// All configuration is read from environment variables, optionally seeded from
// a `.env` file in the working directory.
//
// ### Target
// - `NAMEWATCH_HANDLE`: Account to track, without `@` (default: elonmusk)
// - `NAMEWATCH_POLL_INTERVAL_SECS`: Seconds between checks (default: 600)
//
// ### X API
// - `NAMEWATCH_BEARER_TOKEN`: App-only bearer token (required; `BEARER_TOKEN` also accepted)
// - `NAMEWATCH_API_BASE`: API base URL (default: https://api.twitter.com/2)
// - `NAMEWATCH_RATE_WINDOW_SECS`, `NAMEWATCH_RATE_THRESHOLD`: Request budget
// - `NAMEWATCH_MAX_RETRIES`, `NAMEWATCH_BACKOFF_BASE_SECS`, `NAMEWATCH_RESET_BUFFER_SECS`
//
// ### Notifications
// - `NAMEWATCH_NOTIFY_MODE`: change-only | change-or-reminder
// - `NAMEWATCH_REMINDER_INTERVAL_SECS`: Seconds between reminders (default: 3600)
// - `SENDER_EMAIL`, `SENDER_PASSWORD`, `RECEIVER_EMAIL`: Email credentials
// - `NAMEWATCH_SMTP_HOST`, `NAMEWATCH_SMTP_PORT`: SMTP relay
//
// ### Daemon
// - `NAMEWATCH_LISTEN_ADDR`: Query server address (default: 127.0.0.1:5000)
// - `NAMEWATCH_LOG_LEVEL`: trace, debug, info, warn, error (default: info)

use anyhow::{Context, Result};
use namewatch_core::{NotifyMode, WatchConfig};
use namewatch_notify_smtp::{DEFAULT_SMTP_HOST, DEFAULT_SMTP_PORT, EmailSettings};
use std::fmt::Display;
use std::net::SocketAddr;
use std::str::FromStr;
use tracing::Level;

const DEFAULT_HANDLE: &str = "elonmusk";
const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:5000";

/// Daemon configuration
pub struct Config {
    pub bearer_token: String,
    pub api_base: Option<String>,
    pub watch: WatchConfig,
    pub email: EmailSettings,
    pub listen_addr: SocketAddr,
    pub log_level: String,
}

// Custom Debug implementation that hides the bearer token
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("bearer_token", &"<REDACTED>")
            .field("api_base", &self.api_base)
            .field("watch", &self.watch)
            .field("email", &self.email)
            .field("listen_addr", &self.listen_addr)
            .field("log_level", &self.log_level)
            .finish()
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bearer_token = var("NAMEWATCH_BEARER_TOKEN")
            .or_else(|| var("BEARER_TOKEN"))
            .context(
                "NAMEWATCH_BEARER_TOKEN is required. \
                Set it via: export NAMEWATCH_BEARER_TOKEN=your_token",
            )?;

        let handle = var("NAMEWATCH_HANDLE").unwrap_or_else(|| DEFAULT_HANDLE.to_string());
        let mut watch = WatchConfig::new(handle.trim().trim_start_matches('@'));

        watch.poll.interval_secs =
            parse_var(&var, "NAMEWATCH_POLL_INTERVAL_SECS", watch.poll.interval_secs)?;
        watch.rate_limit.window_secs =
            parse_var(&var, "NAMEWATCH_RATE_WINDOW_SECS", watch.rate_limit.window_secs)?;
        watch.rate_limit.threshold =
            parse_var(&var, "NAMEWATCH_RATE_THRESHOLD", watch.rate_limit.threshold)?;
        watch.retry.max_retries =
            parse_var(&var, "NAMEWATCH_MAX_RETRIES", watch.retry.max_retries)?;
        watch.retry.backoff_base_secs = parse_var(
            &var,
            "NAMEWATCH_BACKOFF_BASE_SECS",
            watch.retry.backoff_base_secs,
        )?;
        watch.retry.reset_buffer_secs = parse_var(
            &var,
            "NAMEWATCH_RESET_BUFFER_SECS",
            watch.retry.reset_buffer_secs,
        )?;
        watch.notify.mode = parse_var(&var, "NAMEWATCH_NOTIFY_MODE", NotifyMode::default())?;
        watch.notify.reminder_interval_secs = parse_var(
            &var,
            "NAMEWATCH_REMINDER_INTERVAL_SECS",
            watch.notify.reminder_interval_secs,
        )?;

        let email = email_settings(&var)?;

        let listen_addr = var("NAMEWATCH_LISTEN_ADDR")
            .unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string());
        let listen_addr = listen_addr.trim().parse().with_context(|| {
            format!(
                "NAMEWATCH_LISTEN_ADDR '{}' is not a valid socket address",
                listen_addr
            )
        })?;

        Ok(Self {
            bearer_token,
            api_base: var("NAMEWATCH_API_BASE"),
            watch,
            email,
            listen_addr,
            log_level: var("NAMEWATCH_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }

    /// Validate the configuration
    ///
    /// Runs the core `WatchConfig` checks, then the daemon's own ranges.
    pub fn validate(&self) -> Result<()> {
        let token_lower = self.bearer_token.to_lowercase();
        if token_lower.contains("your_token")
            || token_lower.contains("replace_me")
            || token_lower == "token"
        {
            anyhow::bail!(
                "NAMEWATCH_BEARER_TOKEN appears to be a placeholder. \
                Use the bearer token from your X developer app."
            );
        }

        self.watch
            .validate()
            .map_err(|e| anyhow::anyhow!("{}", e))?;

        let interval = self.watch.poll.interval_secs;
        if !(10..=86_400).contains(&interval) {
            anyhow::bail!(
                "NAMEWATCH_POLL_INTERVAL_SECS must be between 10 and 86400 seconds. Got: {}",
                interval
            );
        }

        let max_retries = self.watch.retry.max_retries;
        if !(1..=10).contains(&max_retries) {
            anyhow::bail!(
                "NAMEWATCH_MAX_RETRIES must be between 1 and 10. Got: {}",
                max_retries
            );
        }

        if let Some(ref api_base) = self.api_base
            && !api_base.starts_with("https://")
            && !api_base.starts_with("http://")
        {
            anyhow::bail!(
                "NAMEWATCH_API_BASE must use HTTP or HTTPS scheme. Got: {}",
                api_base
            );
        }

        validate_smtp_port(&self.email)?;
        self.log_level()?;

        Ok(())
    }

    /// Parsed log level
    pub fn log_level(&self) -> Result<Level> {
        parse_log_level(&self.log_level)
    }
}

/// Configuration for `namewatchd test-email`
///
/// Only the email settings, the handle used in the message text and the log
/// level are read; the X API token is not needed.
#[derive(Debug)]
pub struct TestEmailConfig {
    pub handle: String,
    pub email: EmailSettings,
    pub log_level: String,
}

impl TestEmailConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Ok(Self {
            handle: var("NAMEWATCH_HANDLE")
                .map(|h| h.trim().trim_start_matches('@').to_string())
                .unwrap_or_else(|| DEFAULT_HANDLE.to_string()),
            email: email_settings(&var)?,
            log_level: var("NAMEWATCH_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let missing = self.email.missing_credentials();
        if !missing.is_empty() {
            anyhow::bail!(
                "test-email needs all email credentials. Missing: {}",
                missing.join(", ")
            );
        }

        WatchConfig::new(self.handle.clone())
            .target
            .validate()
            .map_err(|e| anyhow::anyhow!("{}", e))?;
        validate_smtp_port(&self.email)?;
        self.log_level()?;

        Ok(())
    }

    /// Parsed log level
    pub fn log_level(&self) -> Result<Level> {
        parse_log_level(&self.log_level)
    }
}

fn email_settings(var: &impl Fn(&str) -> Option<String>) -> Result<EmailSettings> {
    Ok(EmailSettings {
        host: var("NAMEWATCH_SMTP_HOST").unwrap_or_else(|| DEFAULT_SMTP_HOST.to_string()),
        port: parse_var(var, "NAMEWATCH_SMTP_PORT", DEFAULT_SMTP_PORT)?,
        sender: var("SENDER_EMAIL"),
        password: var("SENDER_PASSWORD"),
        recipient: var("RECEIVER_EMAIL"),
    })
}

fn validate_smtp_port(email: &EmailSettings) -> Result<()> {
    if email.port == 0 {
        anyhow::bail!("NAMEWATCH_SMTP_PORT must be > 0");
    }
    Ok(())
}

fn parse_log_level(raw: &str) -> Result<Level> {
    match raw.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => anyhow::bail!(
            "NAMEWATCH_LOG_LEVEL '{}' is not valid. \
            Valid levels: trace, debug, info, warn, error",
            raw
        ),
    }
}

fn parse_var<T>(var: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match var(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{} '{}' is not valid: {}", key, raw, e)),
    }
}
