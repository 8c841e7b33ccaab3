//! Outbound customer email.
//!
//! Handlers depend on the [`Mailer`] trait so tests can substitute a
//! recording implementation. [`SmtpMailer`] delivers through `lettre`;
//! [`LogMailer`] is used when no SMTP host is configured.

pub mod email;

pub use email::{EmailConfig, EmailError, LogMailer, Mailer, SmtpMailer};
