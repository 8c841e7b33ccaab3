//! Applies verified payment events to users, enrollments and the
//! downgrade schedule.
//!
//! Every branch is idempotent so the provider may redeliver an event after
//! a database failure. Email failures are logged and never fail the event.

use chrono::{DateTime, Utc};
use quizdeck_core::plan::{self, DowngradeAction, EntitlementChange};
use quizdeck_core::types::Timestamp;
use quizdeck_db::models::user::{CreateUser, User};
use quizdeck_db::repositories::{DowngradeRepo, QuestionBankRepo, UserRepo};
use quizdeck_notify::Mailer;
use sqlx::PgPool;

use super::events::{
    CheckoutSession, Event, Invoice, PaymentIntent, Subscription, CHECKOUT_SESSION_COMPLETED,
    INVOICE_PAYMENT_FAILED, METADATA_URL_SLUG, PAYMENT_INTENT_SUCCEEDED, SUBSCRIPTION_DELETED,
    SUBSCRIPTION_UPDATED,
};

#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    /// `data.object` did not match the event type.
    #[error("Invalid event payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Dispatch one verified event.
pub async fn handle_event(
    pool: &PgPool,
    mailer: &dyn Mailer,
    event: &Event,
    now: Timestamp,
) -> Result<(), WebhookError> {
    match event.event_type.as_str() {
        CHECKOUT_SESSION_COMPLETED => checkout_completed(pool, mailer, event.object()?).await,
        SUBSCRIPTION_DELETED => {
            let sub: Subscription = event.object()?;
            let period_end = sub.current_period_end.and_then(from_unix).unwrap_or(now);
            let change = plan::subscription_deleted(period_end, now);
            apply_to_customer(pool, mailer, sub.customer.as_deref(), change).await
        }
        SUBSCRIPTION_UPDATED => {
            let sub: Subscription = event.object()?;
            let period_end = sub.current_period_end.and_then(from_unix);
            let change =
                plan::subscription_updated(&sub.status, period_end, sub.cancel_at_period_end);
            apply_to_customer(pool, mailer, sub.customer.as_deref(), change).await
        }
        INVOICE_PAYMENT_FAILED => {
            let invoice: Invoice = event.object()?;
            apply_to_customer(pool, mailer, invoice.customer.as_deref(), plan::payment_failed())
                .await
        }
        PAYMENT_INTENT_SUCCEEDED => {
            payment_succeeded(mailer, event.object()?).await;
            Ok(())
        }
        other => {
            tracing::info!(event_type = other, event_id = ?event.id, "Ignoring webhook event");
            Ok(())
        }
    }
}

fn from_unix(secs: i64) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(secs, 0)
}

// ---------------------------------------------------------------------------
// Purchases
// ---------------------------------------------------------------------------

async fn checkout_completed(
    pool: &PgPool,
    mailer: &dyn Mailer,
    session: CheckoutSession,
) -> Result<(), WebhookError> {
    let Some(user) = resolve_checkout_user(pool, &session).await? else {
        tracing::warn!(customer = ?session.customer, "Checkout completed for unknown customer");
        return Ok(());
    };

    let Some(slug) = session.metadata.get(METADATA_URL_SLUG) else {
        tracing::warn!(user_id = user.id, "Checkout completed without a product slug");
        return Ok(());
    };

    let Some(bank) = QuestionBankRepo::find_by_url_slug(pool, slug).await? else {
        tracing::warn!(user_id = user.id, slug = %slug, "Checkout for unknown question bank");
        return Ok(());
    };

    if !QuestionBankRepo::enroll(pool, bank.id, user.id).await? {
        tracing::info!(user_id = user.id, bank_id = bank.id, "User already enrolled");
        return Ok(());
    }
    tracing::info!(user_id = user.id, bank_id = bank.id, "User enrolled in question bank");

    send_best_effort(
        mailer,
        &user.email,
        "Invoice for your purchase",
        &format!("Thank you for purchasing {}. Your invoice is attached.", bank.title),
    )
    .await;
    send_best_effort(
        mailer,
        &user.email,
        "Thank you for your purchase!",
        &format!(
            "You have successfully enrolled in {}. If you have any questions, feel free to reach out.",
            bank.title
        ),
    )
    .await;
    Ok(())
}

/// The purchasing user: by customer reference, else by the checkout email
/// (created if needed and linked to the customer reference).
async fn resolve_checkout_user(
    pool: &PgPool,
    session: &CheckoutSession,
) -> Result<Option<User>, sqlx::Error> {
    if let Some(customer) = session.customer.as_deref() {
        if let Some(user) = UserRepo::find_by_stripe_customer(pool, customer).await? {
            return Ok(Some(user));
        }
    }

    let Some(details) = session.customer_details.as_ref() else {
        return Ok(None);
    };
    let Some(email) = details.email.as_deref() else {
        return Ok(None);
    };

    let user = match UserRepo::find_by_email(pool, email).await? {
        Some(user) => user,
        None => {
            let input = CreateUser {
                name: details.name.clone().unwrap_or_else(|| email.to_string()),
                email: email.to_string(),
                image: None,
            };
            let user = UserRepo::create(pool, &input).await?;
            tracing::info!(user_id = user.id, "Created user from checkout");
            user
        }
    };

    match session.customer.as_deref() {
        Some(customer) if user.stripe_customer_id.is_none() => {
            UserRepo::set_stripe_customer(pool, user.id, customer).await
        }
        _ => Ok(Some(user)),
    }
}

async fn payment_succeeded(mailer: &dyn Mailer, intent: PaymentIntent) {
    let Some(email) = intent.receipt_email.as_deref() else {
        return;
    };
    let body = match intent.receipt_url() {
        Some(url) => format!("Your payment was successful. You can view your receipt at this link: {url}"),
        None => "Your payment was successful.".to_string(),
    };
    send_best_effort(mailer, email, "Your Payment Receipt", &body).await;
}

// ---------------------------------------------------------------------------
// Subscriptions
// ---------------------------------------------------------------------------

async fn apply_to_customer(
    pool: &PgPool,
    mailer: &dyn Mailer,
    customer: Option<&str>,
    change: EntitlementChange,
) -> Result<(), WebhookError> {
    let Some(customer) = customer else {
        tracing::warn!("Subscription event without customer reference");
        return Ok(());
    };
    let Some(user) = UserRepo::find_by_stripe_customer(pool, customer).await? else {
        tracing::warn!(customer, "Subscription event for unknown customer");
        return Ok(());
    };

    UserRepo::set_entitlement(pool, user.id, change.plan, change.subscription_end).await?;
    match change.downgrade {
        DowngradeAction::Keep => {}
        DowngradeAction::Schedule(at) => {
            DowngradeRepo::schedule(pool, user.id, at).await?;
            tracing::info!(user_id = user.id, downgrade_at = %at, "Downgrade scheduled");
        }
        DowngradeAction::Clear => {
            if DowngradeRepo::cancel(pool, user.id).await? {
                tracing::info!(user_id = user.id, "Pending downgrade cleared");
            }
        }
    }
    tracing::info!(user_id = user.id, plan = %change.plan, "Entitlement updated");

    if let Some(notice) = change.notice {
        send_best_effort(mailer, &user.email, notice.subject, notice.body).await;
    }
    Ok(())
}

async fn send_best_effort(mailer: &dyn Mailer, to: &str, subject: &str, body: &str) {
    if let Err(e) = mailer.send(to, subject, body).await {
        tracing::warn!(error = %e, subject, "Webhook email failed");
    }
}
