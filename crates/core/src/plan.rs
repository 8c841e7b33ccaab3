//! Plan tiers and the entitlement transitions driven by payment events.
//!
//! Each transition is a pure function returning an [`EntitlementChange`]
//! that the webhook handler persists. Keeping the rules here lets them be
//! tested without a database or a payment provider.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::types::Timestamp;

pub const PLAN_FREE: &str = "free";
pub const PLAN_PREMIUM: &str = "premium";

/// Subscription status the provider reports for a paying customer.
pub const SUBSCRIPTION_STATUS_ACTIVE: &str = "active";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    Free,
    Premium,
}

impl Plan {
    pub fn as_str(self) -> &'static str {
        match self {
            Plan::Free => PLAN_FREE,
            Plan::Premium => PLAN_PREMIUM,
        }
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Plan {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            PLAN_FREE => Ok(Plan::Free),
            PLAN_PREMIUM => Ok(Plan::Premium),
            other => Err(format!("Unknown plan '{other}'")),
        }
    }
}

/// What to do with the user's pending downgrade record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DowngradeAction {
    Keep,
    Schedule(Timestamp),
    Clear,
}

/// A customer-facing email triggered by a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub subject: &'static str,
    pub body: &'static str,
}

pub const NOTICE_CANCELLED: Notice = Notice {
    subject: "We're sad to see you go!",
    body: "Could you tell us why you unsubscribed? Your premium access stays active \
           until the end of the current billing period.",
};

pub const NOTICE_CANCEL_AT_PERIOD_END: Notice = Notice {
    subject: "We noticed you canceled",
    body: "Your subscription will not renew. You keep premium access until the end of \
           the current billing period.",
};

/// The result of applying one payment event to a user's entitlement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntitlementChange {
    pub plan: Plan,
    /// `Some` replaces the stored subscription end date.
    pub subscription_end: Option<Timestamp>,
    pub downgrade: DowngradeAction,
    pub notice: Option<Notice>,
}

/// `customer.subscription.updated`: premium iff the status is `active`.
pub fn subscription_updated(
    status: &str,
    period_end: Option<Timestamp>,
    cancel_at_period_end: bool,
) -> EntitlementChange {
    let active = status == SUBSCRIPTION_STATUS_ACTIVE;
    EntitlementChange {
        plan: if active { Plan::Premium } else { Plan::Free },
        subscription_end: period_end,
        downgrade: if active && !cancel_at_period_end {
            DowngradeAction::Clear
        } else {
            DowngradeAction::Keep
        },
        notice: cancel_at_period_end.then_some(NOTICE_CANCEL_AT_PERIOD_END),
    }
}

/// `customer.subscription.deleted`: keep premium until the period ends,
/// then downgrade through the durable schedule.
///
/// A period end that has already passed downgrades immediately.
pub fn subscription_deleted(period_end: Timestamp, now: Timestamp) -> EntitlementChange {
    let (plan, downgrade) = if period_end <= now {
        (Plan::Free, DowngradeAction::Clear)
    } else {
        (Plan::Premium, DowngradeAction::Schedule(period_end))
    };
    EntitlementChange {
        plan,
        subscription_end: Some(period_end),
        downgrade,
        notice: Some(NOTICE_CANCELLED),
    }
}

/// `invoice.payment_failed`: drop to free immediately.
pub fn payment_failed() -> EntitlementChange {
    EntitlementChange {
        plan: Plan::Free,
        subscription_end: None,
        downgrade: DowngradeAction::Clear,
        notice: None,
    }
}
