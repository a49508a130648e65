use super::LedgerError;
use crate::db::Repository;
use crate::domain::{AccountId, MatchResult, Membership, Player, PointDelta, POINT_MAX};
use chrono::{DateTime, NaiveDate, Utc};
use std::sync::Arc;

/// Currencies, match statistics and conduct for each player.
#[derive(Clone)]
pub struct PlayerLedger {
    repo: Arc<Repository>,
}

impl PlayerLedger {
    pub fn new(repo: Arc<Repository>) -> Self {
        Self { repo }
    }

    pub async fn get_player(&self, account: &AccountId) -> Result<Option<Player>, LedgerError> {
        Ok(self.repo.get_player(account).await?)
    }

    pub async fn player_exists(&self, account: &AccountId) -> Result<bool, LedgerError> {
        Ok(self.repo.player_exists(account).await?)
    }

    /// Add both deltas, creating the player on first use.
    ///
    /// Changes nothing and fails with `InsufficientBalance` if either currency
    /// would go negative, or `BalanceLimitExceeded` if one would pass
    /// `POINT_MAX`.
    pub async fn apply_point_delta(
        &self,
        account: &AccountId,
        season_delta: Option<i64>,
        member_delta: Option<i64>,
    ) -> Result<Player, LedgerError> {
        let delta = PointDelta {
            season: season_delta.unwrap_or(0),
            member: member_delta.unwrap_or(0),
        };
        if !delta.within_bounds() {
            return Err(LedgerError::Validation(format!(
                "point delta must be within ±{}",
                POINT_MAX
            )));
        }

        if !self.repo.apply_point_delta(account, delta).await? {
            let current = self
                .repo
                .get_player(account)
                .await?
                .unwrap_or_else(|| Player::new(account.clone()));
            let err = if delta.overflows(&current) {
                LedgerError::BalanceLimitExceeded
            } else {
                LedgerError::InsufficientBalance
            };
            tracing::info!(
                account = %account,
                season = delta.season,
                member = delta.member,
                reason = %err,
                "point delta refused"
            );
            return Err(err);
        }

        tracing::debug!(
            account = %account,
            season = delta.season,
            member = delta.member,
            "point delta applied"
        );

        Ok(self
            .repo
            .get_player(account)
            .await?
            .unwrap_or_else(|| Player::new(account.clone())))
    }

    pub async fn record_match_result(
        &self,
        account: &AccountId,
        result: &MatchResult,
        now: DateTime<Utc>,
    ) -> Result<Player, LedgerError> {
        let player = self.repo.record_match(account, result, now).await?;
        tracing::debug!(
            account = %account,
            winner = result.is_winner,
            disconnected = result.disconnected,
            earned = result.earned_points(),
            conduct = player.conduct_point,
            "match recorded"
        );
        Ok(player)
    }

    /// Credit `bonus` member points at most once per UTC day.
    ///
    /// Returns `false` if today's bonus was already granted.
    pub async fn grant_daily_membership_bonus(
        &self,
        membership: &Membership,
        bonus: i64,
        today: NaiveDate,
    ) -> Result<bool, LedgerError> {
        if bonus <= 0 {
            return Err(LedgerError::Validation(format!(
                "daily bonus must be positive, got {}",
                bonus
            )));
        }
        if membership
            .last_daily_grant_date
            .is_some_and(|last| last >= today)
        {
            return Ok(false);
        }

        let granted = self
            .repo
            .grant_daily_bonus(&membership.account_id, today, bonus)
            .await?;
        if granted {
            tracing::info!(
                account = %membership.account_id,
                bonus,
                %today,
                "daily membership bonus granted"
            );
        }
        Ok(granted)
    }
}
