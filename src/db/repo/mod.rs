//! Repository layer for database operations.
//!
//! This module provides the `Repository` struct for all database operations.
//! Methods are organized across submodules by entity:
//! - `players.rs` - Currencies, match statistics, ranking queries
//! - `memberships.rs` - Membership tier/expiry and the daily bonus claim
//! - `orders.rs` - Payment orders and provider contact links
//! - `properties.rs` - Attribute allocation under the level budget
//! - `rankings.rs` - Daily ranking snapshots
//!
//! Every invariant that must hold under concurrent requests (currency floor,
//! attribute budget, order uniqueness, single daily grant) is checked inside the
//! writing statement itself, so a stale read can never break it.

mod memberships;
mod orders;
mod players;
mod properties;
mod rankings;

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqlitePool;

/// Repository for database operations.
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Repository { pool }
    }

    /// Connectivity check for readiness.
    pub async fn ping(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

fn from_ms(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or_default()
}

fn decode_error(column: &str, value: &str) -> sqlx::Error {
    sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: format!("unexpected value {:?}", value).into(),
    }
}
