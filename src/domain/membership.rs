//! Membership record and the derived "enabled" predicate.

use crate::domain::{AccountId, Tier};
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Membership {
    pub account_id: AccountId,
    pub tier: Tier,
    /// Expiry at UTC midnight of this date.
    pub expire_date: NaiveDate,
    pub last_daily_grant_date: Option<NaiveDate>,
}

impl Membership {
    /// Expiry as a UTC timestamp (midnight).
    pub fn expire_at(&self) -> DateTime<Utc> {
        utc_midnight(self.expire_date)
    }

    /// Enabled while `expire_at > now - 1 day`, i.e. a full day of grace past expiry.
    pub fn is_enabled_at(&self, now: DateTime<Utc>) -> bool {
        self.expire_at() > now - Duration::days(1)
    }
}

pub fn utc_midnight(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}
