//! Email delivery via SMTP.
//!
//! Configuration is loaded from environment variables; if `EMAIL_HOST` is
//! not set, [`EmailConfig::from_env`] returns `None` and the caller should
//! fall back to [`LogMailer`].

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Error type for email delivery failures.
#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    /// SMTP transport-level failure (authentication, connection, etc.).
    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    /// The recipient or sender address could not be parsed.
    #[error("Email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),

    /// The MIME message could not be assembled.
    #[error("Email build error: {0}")]
    Build(String),
}

// ---------------------------------------------------------------------------
// Mailer trait
// ---------------------------------------------------------------------------

/// Sends a plain-text email.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), EmailError>;
}

// ---------------------------------------------------------------------------
// EmailConfig
// ---------------------------------------------------------------------------

/// Default SMTP port (implicit TLS).
const DEFAULT_SMTP_PORT: u16 = 465;

/// Port that selects implicit TLS instead of STARTTLS.
const IMPLICIT_TLS_PORT: u16 = 465;

/// Configuration for the SMTP email delivery service.
#[derive(Debug, Clone)]
pub struct EmailConfig {
    /// SMTP server hostname.
    pub smtp_host: String,
    /// SMTP server port (defaults to 465).
    pub smtp_port: u16,
    /// RFC 5322 "From" address.
    pub from_address: String,
    /// Optional SMTP username.
    pub smtp_user: Option<String>,
    /// Optional SMTP password.
    pub smtp_password: Option<String>,
}

impl EmailConfig {
    /// Load configuration from environment variables.
    ///
    /// Returns `None` if `EMAIL_HOST` is not set, signalling that email
    /// delivery is not configured.
    ///
    /// | Variable     | Required | Default                  |
    /// |--------------|----------|--------------------------|
    /// | `EMAIL_HOST` | yes      | --                       |
    /// | `EMAIL_PORT` | no       | `465`                    |
    /// | `EMAIL_USER` | no       | --                       |
    /// | `EMAIL_PASS` | no       | --                       |
    /// | `EMAIL_FROM` | no       | `EMAIL_USER`, else `noreply@localhost` |
    pub fn from_env() -> Option<Self> {
        let smtp_host = std::env::var("EMAIL_HOST").ok()?;
        let smtp_user = std::env::var("EMAIL_USER").ok();
        let from_address = std::env::var("EMAIL_FROM")
            .ok()
            .or_else(|| smtp_user.clone())
            .unwrap_or_else(|| "noreply@localhost".to_string());
        Some(Self {
            smtp_host,
            smtp_port: std::env::var("EMAIL_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_SMTP_PORT),
            from_address,
            smtp_user,
            smtp_password: std::env::var("EMAIL_PASS").ok(),
        })
    }
}

// ---------------------------------------------------------------------------
// SmtpMailer
// ---------------------------------------------------------------------------

/// Delivers email through an SMTP relay.
pub struct SmtpMailer {
    from_address: String,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    /// Build the transport once; it pools connections internally.
    pub fn new(config: EmailConfig) -> Result<Self, EmailError> {
        let relay = if config.smtp_port == IMPLICIT_TLS_PORT {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
        };
        let mut builder = relay.port(config.smtp_port);

        if let (Some(user), Some(pass)) = (config.smtp_user, config.smtp_password) {
            builder = builder.credentials(Credentials::new(user, pass));
        }

        Ok(Self {
            from_address: config.from_address,
            transport: builder.build(),
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), EmailError> {
        let email = build_message(&self.from_address, to, subject, body)?;
        self.transport.send(email).await?;
        tracing::info!(to, subject, "Email sent");
        Ok(())
    }
}

/// Assemble a plain-text message.
fn build_message(from: &str, to: &str, subject: &str, body: &str) -> Result<Message, EmailError> {
    Message::builder()
        .from(from.parse()?)
        .to(to.parse()?)
        .subject(subject)
        .header(ContentType::TEXT_PLAIN)
        .body(body.to_string())
        .map_err(|e| EmailError::Build(e.to_string()))
}

// ---------------------------------------------------------------------------
// LogMailer
// ---------------------------------------------------------------------------

/// Logs messages instead of sending them. Used when SMTP is not configured.
#[derive(Debug, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, to: &str, subject: &str, _body: &str) -> Result<(), EmailError> {
        tracing::info!(to, subject, "Email delivery not configured; message logged only");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
