// # SMTP Notification Sink
//
// This crate provides a `NotificationSink` that delivers plain-text email over
// SMTP with STARTTLS.
//
// ## Behavior
//
// - One message per `send()` call, one recipient
// - Authentication with the sender address and an app password
// - NO retry; a failed send is reported to the dispatcher, which logs it
//
// ## Missing Credentials
//
// `build_sink()` never fails because credentials are absent. If the sender,
// password or recipient is missing it returns a `DisabledSink` and logs a
// warning once, so the poll loop keeps running without notifications.
//
// ## Security Requirements
//
// - The password NEVER appears in logs or `Debug` output

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use namewatch_core::error::SendError;
use namewatch_core::{DisabledSink, Error, NotificationSink, Result};

/// Default SMTP relay
pub const DEFAULT_SMTP_HOST: &str = "smtp.gmail.com";

/// Default submission port (STARTTLS)
pub const DEFAULT_SMTP_PORT: u16 = 587;

/// Email delivery settings
///
/// Credential fields are optional; see [`build_sink`].
#[derive(Clone, PartialEq, Eq)]
pub struct EmailSettings {
    pub host: String,
    pub port: u16,
    pub sender: Option<String>,
    pub password: Option<String>,
    pub recipient: Option<String>,
}

impl Default for EmailSettings {
    fn default() -> Self {
        Self {
            host: DEFAULT_SMTP_HOST.to_string(),
            port: DEFAULT_SMTP_PORT,
            sender: None,
            password: None,
            recipient: None,
        }
    }
}

// Custom Debug implementation that hides the password
impl std::fmt::Debug for EmailSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("sender", &self.sender)
            .field("password", &self.password.as_ref().map(|_| "<REDACTED>"))
            .field("recipient", &self.recipient)
            .finish()
    }
}

impl EmailSettings {
    /// Names of the credential fields that are missing or blank
    pub fn missing_credentials(&self) -> Vec<&'static str> {
        let blank = |v: &Option<String>| v.as_deref().is_none_or(|s| s.trim().is_empty());

        let mut missing = Vec::new();
        if blank(&self.sender) {
            missing.push("SENDER_EMAIL");
        }
        if blank(&self.password) {
            missing.push("SENDER_PASSWORD");
        }
        if blank(&self.recipient) {
            missing.push("RECEIVER_EMAIL");
        }
        missing
    }
}

/// Build the sink for `settings`
///
/// # Returns
///
/// - An [`SmtpSink`] when all credentials are present
/// - A [`DisabledSink`] when any credential is missing
///
/// # Errors
///
/// - `Error::Config` if an address does not parse or the relay cannot be set up
pub fn build_sink(settings: &EmailSettings) -> Result<Box<dyn NotificationSink>> {
    let missing = settings.missing_credentials();
    if !missing.is_empty() {
        let reason = format!("{} not set", missing.join(", "));
        tracing::warn!("Email notifications disabled: {}", reason);
        return Ok(Box::new(DisabledSink::new(reason)));
    }

    Ok(Box::new(SmtpSink::new(settings)?))
}

/// SMTP sink with STARTTLS and login credentials
pub struct SmtpSink {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
}

impl std::fmt::Debug for SmtpSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpSink")
            .field("from", &self.from.to_string())
            .field("to", &self.to.to_string())
            .finish_non_exhaustive()
    }
}

impl SmtpSink {
    /// Create a sink from complete settings
    ///
    /// Must be called inside a Tokio runtime.
    ///
    /// # Errors
    ///
    /// - `Error::Config` if a credential is missing, an address is invalid,
    ///   or the relay host cannot be used for TLS
    pub fn new(settings: &EmailSettings) -> Result<Self> {
        let (Some(sender), Some(password), Some(recipient)) = (
            settings.sender.as_deref(),
            settings.password.as_deref(),
            settings.recipient.as_deref(),
        ) else {
            return Err(Error::config("SMTP sink requires sender, password and recipient"));
        };

        let from = parse_mailbox("SENDER_EMAIL", sender)?;
        let to = parse_mailbox("RECEIVER_EMAIL", recipient)?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.host)
            .map_err(|e| Error::config(format!("Invalid SMTP host '{}': {}", settings.host, e)))?
            .port(settings.port)
            .credentials(Credentials::new(sender.trim().to_string(), password.to_string()))
            .build();

        tracing::info!(
            "Email notifications enabled via {}:{} to {}",
            settings.host,
            settings.port,
            to
        );

        Ok(Self {
            transport,
            from,
            to,
        })
    }

    /// Compose a plain-text message
    pub fn build_message(&self, subject: &str, body: &str) -> std::result::Result<Message, SendError> {
        Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| SendError::Message(e.to_string()))
    }
}

#[async_trait]
impl NotificationSink for SmtpSink {
    async fn send(&self, subject: &str, body: &str) -> std::result::Result<(), SendError> {
        let message = self.build_message(subject, body)?;

        self.transport
            .send(message)
            .await
            .map_err(|e| SendError::Transport(e.to_string()))?;

        tracing::debug!("Email delivered to {}", self.to);
        Ok(())
    }

    fn sink_name(&self) -> &'static str {
        "smtp"
    }
}

fn parse_mailbox(field: &str, value: &str) -> Result<Mailbox> {
    value
        .trim()
        .parse()
        .map_err(|e| Error::config(format!("{} is not a valid address: {}", field, e)))
}
