//! Ranking snapshot operations.

use crate::domain::{AccountId, RankingSnapshot};
use sqlx::Row;

use super::{now_ms, Repository};

impl Repository {
    /// Get the snapshot stored for a `YYYYMMDD` date key.
    ///
    /// # Errors
    /// Returns an error if the query fails or the stored JSON is malformed.
    pub async fn get_ranking_snapshot(
        &self,
        date: &str,
    ) -> Result<Option<RankingSnapshot>, sqlx::Error> {
        let row = sqlx::query(
            "SELECT date, top_account_ids, thresholds FROM ranking_snapshots WHERE date = ?",
        )
        .bind(date)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let ids_json: String = row.get("top_account_ids");
        let thresholds_json: String = row.get("thresholds");
        let ids: Vec<String> =
            serde_json::from_str(&ids_json).map_err(|e| sqlx::Error::Decode(Box::new(e)))?;
        let thresholds: Vec<i64> = serde_json::from_str(&thresholds_json)
            .map_err(|e| sqlx::Error::Decode(Box::new(e)))?;

        Ok(Some(RankingSnapshot {
            date: row.get("date"),
            top_account_ids: ids.into_iter().map(AccountId::from_stored).collect(),
            thresholds,
        }))
    }

    /// Store a snapshot; a concurrent writer for the same day is overwritten.
    ///
    /// # Errors
    /// Returns an error if the upsert fails.
    pub async fn save_ranking_snapshot(&self, snapshot: &RankingSnapshot) -> Result<(), sqlx::Error> {
        let ids: Vec<&str> = snapshot.top_account_ids.iter().map(|a| a.as_str()).collect();
        let ids_json =
            serde_json::to_string(&ids).map_err(|e| sqlx::Error::Protocol(e.to_string()))?;
        let thresholds_json = serde_json::to_string(&snapshot.thresholds)
            .map_err(|e| sqlx::Error::Protocol(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO ranking_snapshots (date, top_account_ids, thresholds, created_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(date) DO UPDATE SET
                top_account_ids = excluded.top_account_ids,
                thresholds = excluded.thresholds,
                created_at = excluded.created_at
            "#,
        )
        .bind(snapshot.date.as_str())
        .bind(ids_json)
        .bind(thresholds_json)
        .bind(now_ms())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
