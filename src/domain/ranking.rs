//! Daily leaderboard snapshot.

use crate::domain::AccountId;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Accounts listed in a snapshot.
pub const RANKING_TOP_SIZE: usize = 1000;
/// Width of each ranking band.
pub const RANKING_BAND_SIZE: usize = 1000;
/// Bands with a recorded threshold: ranks 1000, 2000, 3000, 4000 and 5000.
pub const RANKING_BAND_COUNT: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingSnapshot {
    /// `YYYYMMDD` in UTC.
    pub date: String,
    pub top_account_ids: Vec<AccountId>,
    /// Season point score at the boundary of each band, non-increasing.
    pub thresholds: Vec<i64>,
}

impl RankingSnapshot {
    pub fn date_key(date: NaiveDate) -> String {
        date.format("%Y%m%d").to_string()
    }

    /// Threshold for the band ending at `rank` (1000, 2000, ...).
    pub fn threshold_at_rank(&self, rank: usize) -> Option<i64> {
        if rank == 0 || rank % RANKING_BAND_SIZE != 0 {
            return None;
        }
        self.thresholds.get(rank / RANKING_BAND_SIZE - 1).copied()
    }
}
