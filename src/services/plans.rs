//! Subscription plan catalogue and the plan-limit guard.
//!
//! Stored `max_users`/`max_notes` values of exactly [`UNLIMITED`] mean "no
//! limit". Every comparison and percentage goes through [`Limit`] so the
//! sentinel is never treated as a literal cap of one.

use serde::Serialize;

use super::error::{ServiceError, ServiceResult};
use crate::database::models::{Organization, PlanChange};
use crate::types::SubscriptionTier;

pub const UNLIMITED: i32 = 1;

/// Notes each author may hold in a free organization
pub const FREE_NOTES_PER_AUTHOR: i64 = 3;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub id: SubscriptionTier,
    pub name: &'static str,
    /// Monthly price in cents
    pub price_cents: i64,
    pub max_users: i32,
    pub max_notes: i32,
    pub features: &'static [&'static str],
}

pub static SUBSCRIPTION_PLANS: [Plan; 3] = [
    Plan {
        id: SubscriptionTier::Free,
        name: "Free",
        price_cents: 0,
        max_users: 3,
        max_notes: 3,
        features: &["Up to 3 members", "3 notes per member", "Basic support"],
    },
    Plan {
        id: SubscriptionTier::Pro,
        name: "Pro",
        price_cents: 1900,
        max_users: 10,
        max_notes: UNLIMITED,
        features: &["Up to 10 members", "Unlimited notes", "Priority support"],
    },
    Plan {
        id: SubscriptionTier::Enterprise,
        name: "Enterprise",
        price_cents: 9900,
        max_users: UNLIMITED,
        max_notes: UNLIMITED,
        features: &["Unlimited members", "Unlimited notes", "Dedicated support"],
    },
];

pub fn plan_for(tier: SubscriptionTier) -> &'static Plan {
    match tier {
        SubscriptionTier::Free => &SUBSCRIPTION_PLANS[0],
        SubscriptionTier::Pro => &SUBSCRIPTION_PLANS[1],
        SubscriptionTier::Enterprise => &SUBSCRIPTION_PLANS[2],
    }
}

impl Plan {
    pub fn plan_change(&self) -> PlanChange {
        PlanChange {
            subscription: self.id,
            max_users: self.max_users,
            max_notes: self.max_notes,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Limit {
    Unlimited,
    Capped(i64),
}

impl Limit {
    pub fn from_stored(value: i32) -> Self {
        if value == UNLIMITED {
            Limit::Unlimited
        } else {
            Limit::Capped(i64::from(value.max(0)))
        }
    }

    /// Whether one more item fits on top of `count`
    pub fn allows_another(&self, count: i64) -> bool {
        match self {
            Limit::Unlimited => true,
            Limit::Capped(max) => count < *max,
        }
    }
}

/// Share of the limit in use, 0-100. Unlimited limits always report 0.
pub fn usage_percentage(count: i64, stored_max: i32) -> u32 {
    match Limit::from_stored(stored_max) {
        Limit::Unlimited => 0,
        Limit::Capped(0) => {
            if count > 0 {
                100
            } else {
                0
            }
        }
        Limit::Capped(max) => ((count.max(0) * 100 / max).min(100)) as u32,
    }
}

/// Guard for note creation.
///
/// `author_count` is the author's notes in the organization, `org_count` all
/// notes of the organization.
pub fn check_note_quota(org: &Organization, author_count: i64, org_count: i64) -> ServiceResult<()> {
    if org.subscription == SubscriptionTier::Free && author_count >= FREE_NOTES_PER_AUTHOR {
        return Err(ServiceError::QuotaExceeded {
            message: format!(
                "Free plan limited to {} notes. Upgrade to Pro for unlimited notes.",
                FREE_NOTES_PER_AUTHOR
            ),
            prompt: "Upgrade to Pro".to_string(),
        });
    }

    if let Limit::Capped(max) = Limit::from_stored(org.max_notes) {
        if org_count >= max {
            return Err(ServiceError::QuotaExceeded {
                message: format!("Plan limited to {} notes. Upgrade for more notes.", max),
                prompt: "Upgrade your plan".to_string(),
            });
        }
    }

    Ok(())
}

/// Guard for adding a member, by admin add or invitation accept
pub fn check_member_quota(org: &Organization, member_count: i64) -> ServiceResult<()> {
    let limit = Limit::from_stored(org.max_users);
    if limit.allows_another(member_count) {
        return Ok(());
    }

    let max = match limit {
        Limit::Capped(max) => max,
        Limit::Unlimited => 0,
    };
    Err(ServiceError::QuotaExceeded {
        message: format!("Plan limited to {} members. Upgrade to add more members.", max),
        prompt: if org.subscription == SubscriptionTier::Free {
            "Upgrade to Pro".to_string()
        } else {
            "Upgrade your plan".to_string()
        },
    })
}
