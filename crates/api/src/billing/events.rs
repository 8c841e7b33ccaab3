//! The subset of the provider's event payloads this service reads.

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde::Deserialize;

pub const CHECKOUT_SESSION_COMPLETED: &str = "checkout.session.completed";
pub const SUBSCRIPTION_DELETED: &str = "customer.subscription.deleted";
pub const SUBSCRIPTION_UPDATED: &str = "customer.subscription.updated";
pub const INVOICE_PAYMENT_FAILED: &str = "invoice.payment_failed";
pub const PAYMENT_INTENT_SUCCEEDED: &str = "payment_intent.succeeded";

/// Checkout metadata key naming the purchased question bank.
pub const METADATA_URL_SLUG: &str = "urlSlug";

/// Event envelope: `{id, type, data: {object}}`.
#[derive(Debug, Deserialize)]
pub struct Event {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: EventData,
}

#[derive(Debug, Deserialize)]
pub struct EventData {
    pub object: serde_json::Value,
}

impl Event {
    /// Decode `data.object` as the type matching this event.
    pub fn object<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.data.object.clone())
    }
}

#[derive(Debug, Deserialize)]
pub struct CheckoutSession {
    pub customer: Option<String>,
    #[serde(default)]
    pub customer_details: Option<CustomerDetails>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
pub struct CustomerDetails {
    pub email: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Subscription {
    pub customer: Option<String>,
    #[serde(default)]
    pub status: String,
    /// Unix seconds.
    pub current_period_end: Option<i64>,
    #[serde(default)]
    pub cancel_at_period_end: bool,
}

#[derive(Debug, Deserialize)]
pub struct Invoice {
    pub customer: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PaymentIntent {
    pub receipt_email: Option<String>,
    #[serde(default)]
    pub charges: Option<ChargeList>,
}

#[derive(Debug, Deserialize)]
pub struct ChargeList {
    #[serde(default)]
    pub data: Vec<Charge>,
}

#[derive(Debug, Deserialize)]
pub struct Charge {
    pub receipt_url: Option<String>,
}

impl PaymentIntent {
    /// Receipt link of the first charge, when the provider included one.
    pub fn receipt_url(&self) -> Option<&str> {
        self.charges
            .as_ref()
            .and_then(|c| c.data.first())
            .and_then(|c| c.receipt_url.as_deref())
    }
}
