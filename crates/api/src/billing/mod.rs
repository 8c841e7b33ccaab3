//! Payment-provider webhook: signature verification, event envelope and
//! the entitlement updates each event applies.

pub mod events;
pub mod signature;
pub mod webhook;

/// Webhook verification settings.
#[derive(Debug, Clone)]
pub struct StripeConfig {
    /// Shared signing secret; without it every webhook is rejected.
    pub webhook_secret: Option<String>,
    /// Maximum age of a signed timestamp, in seconds.
    pub signature_tolerance_secs: i64,
}

impl StripeConfig {
    /// Read `STRIPE_WEBHOOK_SECRET` and `STRIPE_SIGNATURE_TOLERANCE_SECS`
    /// (default `300`).
    pub fn from_env() -> Self {
        Self {
            webhook_secret: std::env::var("STRIPE_WEBHOOK_SECRET")
                .ok()
                .filter(|s| !s.is_empty()),
            signature_tolerance_secs: crate::config::parse_env(
                "STRIPE_SIGNATURE_TOLERANCE_SECS",
                300,
            ),
        }
    }
}
