use super::{LedgerError, PlayerLedger};
use crate::config::LedgerConfig;
use crate::db::Repository;
use crate::domain::{AccountId, Membership, Tier};
use crate::engine::{apply_purchase, MembershipChange};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

/// Result of a daily login.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DailyLogin {
    Granted { tier: Tier, bonus: i64 },
    AlreadyGranted,
    NotMember,
}

#[derive(Clone)]
pub struct MembershipLedger {
    repo: Arc<Repository>,
    players: PlayerLedger,
    config: LedgerConfig,
}

impl MembershipLedger {
    pub fn new(repo: Arc<Repository>, players: PlayerLedger, config: LedgerConfig) -> Self {
        Self {
            repo,
            players,
            config,
        }
    }

    pub async fn get_membership(
        &self,
        account: &AccountId,
    ) -> Result<Option<Membership>, LedgerError> {
        Ok(self.repo.get_membership(account).await?)
    }

    /// Apply a purchase of `months` of `tier` and persist the new state.
    pub async fn activate_membership(
        &self,
        account: &AccountId,
        tier: Tier,
        months: i64,
        now: DateTime<Utc>,
    ) -> Result<MembershipChange, LedgerError> {
        let current = self.repo.get_membership(account).await?;
        let (updated, change) = self.plan_purchase(account, current.as_ref(), tier, months, now)?;
        self.repo.save_membership(&updated).await?;

        tracing::info!(
            account = %account,
            purchased = %tier,
            months,
            tier = %change.tier,
            expire_date = %change.expire_date,
            transition = ?change.transition,
            "membership activated"
        );

        Ok(change)
    }

    /// The membership that results from buying `months` of `tier` on top of
    /// `current`, without persisting it.
    pub fn plan_purchase(
        &self,
        account: &AccountId,
        current: Option<&Membership>,
        tier: Tier,
        months: i64,
        now: DateTime<Utc>,
    ) -> Result<(Membership, MembershipChange), LedgerError> {
        if months <= 0 {
            return Err(LedgerError::Validation(format!(
                "membership months must be positive, got {}",
                months
            )));
        }

        let change = apply_purchase(current, tier, months, now, self.config.days_per_month)
            .map_err(|e| LedgerError::Validation(e.to_string()))?;

        let updated = Membership {
            account_id: account.clone(),
            tier: change.tier,
            expire_date: change.expire_date,
            last_daily_grant_date: current.and_then(|m| m.last_daily_grant_date),
        };
        Ok((updated, change))
    }

    /// Grant the tier's daily member-point bonus if the membership is enabled.
    pub async fn daily_login(
        &self,
        account: &AccountId,
        now: DateTime<Utc>,
    ) -> Result<DailyLogin, LedgerError> {
        let Some(membership) = self.repo.get_membership(account).await? else {
            return Ok(DailyLogin::NotMember);
        };
        if !membership.is_enabled_at(now) {
            return Ok(DailyLogin::NotMember);
        }

        let bonus = match membership.tier {
            Tier::Normal => self.config.daily_bonus_normal,
            Tier::Premium => self.config.daily_bonus_premium,
        };

        let granted = self
            .players
            .grant_daily_membership_bonus(&membership, bonus, now.date_naive())
            .await?;

        Ok(if granted {
            DailyLogin::Granted {
                tier: membership.tier,
                bonus,
            }
        } else {
            DailyLogin::AlreadyGranted
        })
    }
}
