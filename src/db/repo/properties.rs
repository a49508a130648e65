//! Player property operations.

use crate::domain::{AccountId, PlayerProperty, PointDelta};
use sqlx::sqlite::SqliteConnection;
use sqlx::Row;

use super::players::{apply_point_delta_conn, ensure_player};
use super::{now_ms, Repository};

impl Repository {
    /// All property levels for an account, ordered by name.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn list_properties(
        &self,
        account: &AccountId,
    ) -> Result<Vec<PlayerProperty>, sqlx::Error> {
        let rows = sqlx::query(
            "SELECT name, level FROM player_properties WHERE account_id = ? ORDER BY name ASC",
        )
        .bind(account.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| PlayerProperty {
                name: row.get("name"),
                level: row.get("level"),
            })
            .collect())
    }

    /// Set a property level only if the sum of all levels stays within `total_level`.
    ///
    /// The budget is evaluated inside the statement against current rows, so a
    /// concurrent upgrade cannot push the sum past the budget. Returns `false` when
    /// the write was refused.
    ///
    /// # Errors
    /// Returns an error if the upsert fails.
    pub async fn set_property_within_budget(
        &self,
        account: &AccountId,
        name: &str,
        level: i64,
        total_level: i64,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO player_properties (account_id, name, level, updated_at)
            SELECT ?, ?, ?, ?
            WHERE (
                SELECT COALESCE(SUM(level), 0) FROM player_properties
                WHERE account_id = ? AND name <> ?
            ) + ? <= ?
            ON CONFLICT(account_id, name) DO UPDATE SET
                level = excluded.level,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(account.as_str())
        .bind(name)
        .bind(level)
        .bind(now_ms())
        .bind(account.as_str())
        .bind(name)
        .bind(level)
        .bind(total_level)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Debit `cost` and delete every property of the account, atomically.
    ///
    /// Returns `false` and leaves everything unchanged if the debit would drive a
    /// currency negative.
    ///
    /// # Errors
    /// Returns an error if the transaction fails.
    pub async fn reset_properties(
        &self,
        account: &AccountId,
        cost: PointDelta,
    ) -> Result<bool, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        if !cost.is_zero() {
            ensure_player(&mut tx, account).await?;
            if !apply_point_delta_conn(&mut tx, account, cost).await? {
                tx.rollback().await?;
                return Ok(false);
            }
        }

        delete_properties_conn(&mut tx, account).await?;
        tx.commit().await?;
        Ok(true)
    }
}

pub(super) async fn delete_properties_conn(
    conn: &mut SqliteConnection,
    account: &AccountId,
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM player_properties WHERE account_id = ?")
        .bind(account.as_str())
        .execute(&mut *conn)
        .await?;
    Ok(())
}
