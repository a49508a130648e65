//! Membership duration arithmetic.
//!
//! States are `None`, `Normal(expire)` and `Premium(expire)`. All arithmetic is in
//! whole days at UTC midnight. Converting time between tiers uses a 0.6 ratio with
//! floor rounding; remaining time is counted with ceiling rounding.
//!
//! A Normal purchase never lowers an active Premium membership: the Normal
//! duration is prorated and stacked on the Premium expiry instead.

use crate::domain::membership::utc_midnight;
use crate::domain::{Membership, Tier};
use chrono::{DateTime, Days, NaiveDate, Utc};
use thiserror::Error;

const PRORATION_NUMERATOR: i64 = 6;
const PRORATION_DENOMINATOR: i64 = 10;
const SECONDS_PER_DAY: i64 = 86_400;

/// How a purchase changed the membership, for logging and analytics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Created,
    /// Same tier, extended from the existing expiry.
    Extended,
    /// Same tier, previous membership had lapsed.
    Restarted,
    /// Normal to Premium; remaining Normal days converted.
    Upgraded { prorated_days: i64 },
    /// Normal purchased on top of active Premium.
    StackedOnPremium { prorated_days: i64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("membership expiry out of range: {months} month(s) from {from}")]
pub struct ExpiryOutOfRange {
    pub months: i64,
    pub from: NaiveDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MembershipChange {
    pub tier: Tier,
    pub expire_date: NaiveDate,
    pub transition: Transition,
}

/// `floor(days * 0.6)`, never negative.
pub fn prorate_days(days: i64) -> i64 {
    let days = days.max(0);
    // split so the multiplication cannot overflow
    days / PRORATION_DENOMINATOR * PRORATION_NUMERATOR
        + days % PRORATION_DENOMINATOR * PRORATION_NUMERATOR / PRORATION_DENOMINATOR
}

/// Whole days left before `expire_date`, rounded up; zero once expired.
pub fn remaining_days(expire_date: NaiveDate, now: DateTime<Utc>) -> i64 {
    let seconds = (utc_midnight(expire_date) - now).num_seconds();
    if seconds <= 0 {
        0
    } else {
        (seconds + SECONDS_PER_DAY - 1) / SECONDS_PER_DAY
    }
}

/// Compute the membership state after buying `months` of `tier`.
///
/// `months` must be positive; callers reject other values before reaching here.
/// Fails instead of producing a date past chrono's range.
pub fn apply_purchase(
    current: Option<&Membership>,
    tier: Tier,
    months: i64,
    now: DateTime<Utc>,
    days_per_month: i64,
) -> Result<MembershipChange, ExpiryOutOfRange> {
    let today = now.date_naive();
    let out_of_range = |from| ExpiryOutOfRange { months, from };
    let purchased_days = months
        .checked_mul(days_per_month)
        .ok_or_else(|| out_of_range(today))?;

    let active = current.filter(|m| m.is_enabled_at(now));

    let (base, days, tier, transition) = match (active, tier) {
        (None, _) => {
            let transition = if current.is_some() {
                Transition::Restarted
            } else {
                Transition::Created
            };
            (today, purchased_days, tier, transition)
        }
        (Some(m), purchased) if m.tier == purchased => {
            (m.expire_date, purchased_days, tier, Transition::Extended)
        }
        (Some(m), Tier::Premium) => {
            let prorated_days = prorate_days(remaining_days(m.expire_date, now));
            let days = prorated_days
                .checked_add(purchased_days)
                .ok_or_else(|| out_of_range(today))?;
            (
                today,
                days,
                Tier::Premium,
                Transition::Upgraded { prorated_days },
            )
        }
        (Some(m), Tier::Normal) => {
            let prorated_days = prorate_days(purchased_days);
            (
                m.expire_date,
                prorated_days,
                Tier::Premium,
                Transition::StackedOnPremium { prorated_days },
            )
        }
    };

    let expire_date = add_days(base, days).ok_or_else(|| out_of_range(base))?;
    Ok(MembershipChange {
        tier,
        expire_date,
        transition,
    })
}

fn add_days(date: NaiveDate, days: i64) -> Option<NaiveDate> {
    let days = u64::try_from(days).ok()?;
    date.checked_add_days(Days::new(days))
}
