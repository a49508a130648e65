use super::LedgerError;
use crate::config::LedgerConfig;
use crate::db::Repository;
use crate::domain::property::is_known_property;
use crate::domain::{AccountId, Player, PlayerProperty, PointDelta};
use crate::engine::allocation::used_level;
use crate::engine::{check_upgrade, total_level, LevelCurve, SeasonLevels};
use serde::Serialize;
use std::sync::Arc;

/// Attribute budget view for one player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertySummary {
    pub total_level: i64,
    pub used_level: i64,
    pub useable_level: i64,
    pub properties: Vec<PlayerProperty>,
}

/// Keeps the sum of attribute levels within the player's total level.
#[derive(Clone)]
pub struct PropertyGuard {
    repo: Arc<Repository>,
    config: LedgerConfig,
}

impl PropertyGuard {
    pub fn new(repo: Arc<Repository>, config: LedgerConfig) -> Self {
        Self { repo, config }
    }

    pub async fn summary(&self, account: &AccountId) -> Result<PropertySummary, LedgerError> {
        let player = self.player_or_new(account).await?;
        let properties = self.repo.list_properties(account).await?;
        let total = total_level(player.season_point_total, player.member_point_total);
        let used = used_level(&properties);

        Ok(PropertySummary {
            total_level: total,
            used_level: used,
            useable_level: total - used,
            properties,
        })
    }

    /// Set `name` to `target_level` if the budget allows it.
    pub async fn upgrade_property(
        &self,
        account: &AccountId,
        name: &str,
        target_level: i64,
    ) -> Result<PropertySummary, LedgerError> {
        if !is_known_property(name) {
            return Err(LedgerError::InvalidProperty(name.to_string()));
        }
        if target_level < 0 {
            return Err(LedgerError::Validation(format!(
                "property level must not be negative, got {}",
                target_level
            )));
        }

        let player = self.player_or_new(account).await?;
        let total = total_level(player.season_point_total, player.member_point_total);
        let properties = self.repo.list_properties(account).await?;

        let check = check_upgrade(&properties, name, target_level, total);
        let budget_exceeded = LedgerError::BudgetExceeded {
            used: check.used_level,
            delta: check.level_delta,
            total,
        };
        if !check.fits() {
            return Err(budget_exceeded);
        }

        // re-checked against current rows inside the write
        if !self
            .repo
            .set_property_within_budget(account, name, target_level, total)
            .await?
        {
            tracing::info!(account = %account, name, "property upgrade lost a concurrent race");
            return Err(budget_exceeded);
        }

        tracing::debug!(
            account = %account,
            name,
            from = check.current_level,
            to = target_level,
            "property level set"
        );

        self.summary(account).await
    }

    /// Pay the reset cost and clear every property.
    ///
    /// Member currency costs a fixed amount; season currency costs the points
    /// needed for the player's next season level.
    pub async fn reset_all_properties(
        &self,
        account: &AccountId,
        use_member_currency: bool,
    ) -> Result<PointDelta, LedgerError> {
        let cost = if use_member_currency {
            PointDelta::member(-self.config.member_reset_cost)
        } else {
            let player = self.player_or_new(account).await?;
            let level = SeasonLevels.level_for_points(player.season_point_total);
            PointDelta::season(-SeasonLevels.points_to_reach_next_level(level))
        };

        if !self.repo.reset_properties(account, cost).await? {
            return Err(LedgerError::InsufficientBalance);
        }

        tracing::info!(
            account = %account,
            season_cost = -cost.season,
            member_cost = -cost.member,
            "properties reset"
        );
        Ok(cost)
    }

    /// Clear every property without charging; granted by a purchased reset.
    pub async fn free_reset(&self, account: &AccountId) -> Result<(), LedgerError> {
        self.repo
            .reset_properties(account, PointDelta::default())
            .await?;
        tracing::info!(account = %account, "properties reset without charge");
        Ok(())
    }

    async fn player_or_new(&self, account: &AccountId) -> Result<Player, LedgerError> {
        Ok(self
            .repo
            .get_player(account)
            .await?
            .unwrap_or_else(|| Player::new(account.clone())))
    }
}
