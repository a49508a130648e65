use super::LedgerError;
use crate::db::Repository;
use crate::domain::ranking::{RANKING_BAND_COUNT, RANKING_BAND_SIZE, RANKING_TOP_SIZE};
use crate::domain::{AccountId, RankingSnapshot};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Builds at most one leaderboard snapshot per UTC day.
#[derive(Clone)]
pub struct RankingService {
    repo: Arc<Repository>,
    denylist: Vec<AccountId>,
}

impl RankingService {
    pub fn new(repo: Arc<Repository>, denylist: Vec<AccountId>) -> Self {
        Self { repo, denylist }
    }

    /// Today's snapshot, computing and storing it on first request.
    pub async fn get_ranking(&self, now: DateTime<Utc>) -> Result<RankingSnapshot, LedgerError> {
        let date = RankingSnapshot::date_key(now.date_naive());
        if let Some(snapshot) = self.repo.get_ranking_snapshot(&date).await? {
            return Ok(snapshot);
        }

        let computed = self.compute(date.clone()).await?;
        self.repo.save_ranking_snapshot(&computed).await?;
        tracing::info!(
            date = %computed.date,
            ranked = computed.top_account_ids.len(),
            thresholds = ?computed.thresholds,
            "ranking snapshot stored"
        );

        // a concurrent writer may have replaced ours; serve whatever is stored
        Ok(self
            .repo
            .get_ranking_snapshot(&date)
            .await?
            .unwrap_or(computed))
    }

    async fn compute(&self, date: String) -> Result<RankingSnapshot, LedgerError> {
        let top = self
            .repo
            .query_players_by_season_points(None, &self.denylist, RANKING_TOP_SIZE)
            .await?;

        let mut threshold = top.last().map(|(_, score)| *score).unwrap_or(0);
        let mut thresholds = Vec::with_capacity(RANKING_BAND_COUNT);
        thresholds.push(threshold);

        for _ in 1..RANKING_BAND_COUNT {
            let band = self
                .repo
                .query_players_by_season_points(Some(threshold), &self.denylist, RANKING_BAND_SIZE)
                .await?;
            threshold = band.last().map(|(_, score)| *score).unwrap_or(0);
            thresholds.push(threshold);
        }

        Ok(RankingSnapshot {
            date,
            top_account_ids: top.into_iter().map(|(account, _)| account).collect(),
            thresholds,
        })
    }
}
