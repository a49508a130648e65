//! Player currency and match statistics operations.

use crate::domain::player::{CONDUCT_MAX, CONDUCT_MIN, POINT_MAX};
use crate::domain::{AccountId, MatchResult, Player, PointDelta};
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnection, SqliteRow};
use sqlx::Row;

use super::{now_ms, Repository};

const PLAYER_COLUMNS: &str = "account_id, season_point_total, member_point_total, match_count, \
     win_count, disconnect_count, conduct_point, last_match_time";

impl Repository {
    /// Get a player by account id.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn get_player(&self, account: &AccountId) -> Result<Option<Player>, sqlx::Error> {
        let sql = format!("SELECT {} FROM players WHERE account_id = ?", PLAYER_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(account.as_str())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(player_from_row).transpose()
    }

    pub async fn player_exists(&self, account: &AccountId) -> Result<bool, sqlx::Error> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM players WHERE account_id = ?")
            .bind(account.as_str())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    /// Apply a currency delta, creating the player first if needed.
    ///
    /// Returns `false` without changing anything when either currency would leave
    /// `[0, POINT_MAX]`.
    ///
    /// # Errors
    /// Returns an error if the transaction fails.
    pub async fn apply_point_delta(
        &self,
        account: &AccountId,
        delta: PointDelta,
    ) -> Result<bool, sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        ensure_player(&mut tx, account).await?;
        let applied = apply_point_delta_conn(&mut tx, account, delta).await?;
        if applied {
            tx.commit().await?;
        } else {
            tx.rollback().await?;
        }
        Ok(applied)
    }

    /// Record one match for the player, creating it if needed, and return the
    /// updated record. Season points saturate at `POINT_MAX`.
    ///
    /// # Errors
    /// Returns an error if the transaction fails.
    pub async fn record_match(
        &self,
        account: &AccountId,
        result: &MatchResult,
        at: DateTime<Utc>,
    ) -> Result<Player, sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        ensure_player(&mut tx, account).await?;

        sqlx::query(
            r#"
            UPDATE players SET
                match_count = match_count + 1,
                win_count = win_count + ?,
                disconnect_count = disconnect_count + ?,
                season_point_total = MIN(?, season_point_total + ?),
                conduct_point = MIN(?, MAX(?, conduct_point + ?)),
                last_match_time = ?,
                updated_at = ?
            WHERE account_id = ?
            "#,
        )
        .bind(i64::from(result.is_winner))
        .bind(i64::from(result.disconnected))
        .bind(POINT_MAX)
        .bind(result.earned_points())
        .bind(CONDUCT_MAX)
        .bind(CONDUCT_MIN)
        .bind(result.conduct_delta())
        .bind(at.to_rfc3339())
        .bind(now_ms())
        .bind(account.as_str())
        .execute(&mut *tx)
        .await?;

        let sql = format!("SELECT {} FROM players WHERE account_id = ?", PLAYER_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(account.as_str())
            .fetch_one(&mut *tx)
            .await?;
        tx.commit().await?;

        player_from_row(&row)
    }

    /// Players ordered by season points descending, ties by account id.
    ///
    /// With `below`, only scores strictly less than it are returned.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn query_players_by_season_points(
        &self,
        below: Option<i64>,
        excluded: &[AccountId],
        limit: usize,
    ) -> Result<Vec<(AccountId, i64)>, sqlx::Error> {
        let mut sql = String::from("SELECT account_id, season_point_total FROM players WHERE 1 = 1");
        if below.is_some() {
            sql.push_str(" AND season_point_total < ?");
        }
        if !excluded.is_empty() {
            let placeholders = vec!["?"; excluded.len()].join(", ");
            sql.push_str(&format!(" AND account_id NOT IN ({})", placeholders));
        }
        sql.push_str(" ORDER BY season_point_total DESC, account_id ASC LIMIT ?");

        let mut query = sqlx::query(&sql);
        if let Some(below) = below {
            query = query.bind(below);
        }
        for account in excluded {
            query = query.bind(account.as_str());
        }
        query = query.bind(i64::try_from(limit).unwrap_or(i64::MAX));

        let rows = query.fetch_all(&self.pool).await?;
        rows.iter()
            .map(|row| -> Result<(AccountId, i64), sqlx::Error> {
                Ok((
                    AccountId::from_stored(row.try_get("account_id")?),
                    row.try_get("season_point_total")?,
                ))
            })
            .collect()
    }
}

pub(super) async fn ensure_player(
    conn: &mut SqliteConnection,
    account: &AccountId,
) -> Result<bool, sqlx::Error> {
    let now = now_ms();
    let result = sqlx::query(
        r#"
        INSERT INTO players (account_id, created_at, updated_at)
        VALUES (?, ?, ?)
        ON CONFLICT(account_id) DO NOTHING
        "#,
    )
    .bind(account.as_str())
    .bind(now)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Conditional update; both balance bounds are part of the WHERE clause.
///
/// A delta whose magnitude exceeds `POINT_MAX` is refused without touching the
/// row, so `total + delta` never leaves the 64-bit range in SQL.
pub(super) async fn apply_point_delta_conn(
    conn: &mut SqliteConnection,
    account: &AccountId,
    delta: PointDelta,
) -> Result<bool, sqlx::Error> {
    if !delta.within_bounds() {
        return Ok(false);
    }
    let result = sqlx::query(
        r#"
        UPDATE players SET
            season_point_total = season_point_total + ?,
            member_point_total = member_point_total + ?,
            updated_at = ?
        WHERE account_id = ?
          AND season_point_total + ? BETWEEN 0 AND ?
          AND member_point_total + ? BETWEEN 0 AND ?
        "#,
    )
    .bind(delta.season)
    .bind(delta.member)
    .bind(now_ms())
    .bind(account.as_str())
    .bind(delta.season)
    .bind(POINT_MAX)
    .bind(delta.member)
    .bind(POINT_MAX)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() > 0)
}

fn player_from_row(row: &SqliteRow) -> Result<Player, sqlx::Error> {
    let last_match_time: Option<String> = row.try_get("last_match_time")?;
    Ok(Player {
        account_id: AccountId::from_stored(row.try_get("account_id")?),
        season_point_total: row.try_get("season_point_total")?,
        member_point_total: row.try_get("member_point_total")?,
        match_count: row.try_get("match_count")?,
        win_count: row.try_get("win_count")?,
        disconnect_count: row.try_get("disconnect_count")?,
        conduct_point: row.try_get("conduct_point")?,
        last_match_time: last_match_time
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|t| t.with_timezone(&Utc)),
    })
}

#[cfg(test)]
mod tests {
    use crate::db::{init_db, Repository};
    use crate::domain::{AccountId, MatchResult, PointDelta, POINT_MAX};
    use chrono::Utc;
    use tempfile::TempDir;

    async fn setup_repo() -> (Repository, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir
            .path()
            .join("test.db")
            .to_string_lossy()
            .to_string();
        let pool = init_db(&db_path).await.expect("init_db failed");
        (Repository::new(pool), temp_dir)
    }

    #[tokio::test]
    async fn test_apply_point_delta_creates_player() {
        let (repo, _temp) = setup_repo().await;
        let account = AccountId::new(1001);

        assert!(!repo.player_exists(&account).await.unwrap());
        assert!(repo
            .apply_point_delta(&account, PointDelta { season: 50, member: 20 })
            .await
            .unwrap());

        let player = repo.get_player(&account).await.unwrap().unwrap();
        assert_eq!(player.season_point_total, 50);
        assert_eq!(player.member_point_total, 20);
        assert_eq!(player.conduct_point, 100);
    }

    #[tokio::test]
    async fn test_apply_point_delta_floor_leaves_both_currencies() {
        let (repo, _temp) = setup_repo().await;
        let account = AccountId::new(1002);
        repo.apply_point_delta(&account, PointDelta { season: 10, member: 10 })
            .await
            .unwrap();

        let applied = repo
            .apply_point_delta(&account, PointDelta { season: 5, member: -11 })
            .await
            .unwrap();
        assert!(!applied);

        let player = repo.get_player(&account).await.unwrap().unwrap();
        assert_eq!(player.season_point_total, 10);
        assert_eq!(player.member_point_total, 10);
    }

    #[tokio::test]
    async fn test_apply_point_delta_refuses_past_limit() {
        let (repo, _temp) = setup_repo().await;
        let account = AccountId::new(1005);
        assert!(repo
            .apply_point_delta(&account, PointDelta::season(POINT_MAX - 5))
            .await
            .unwrap());

        assert!(!repo
            .apply_point_delta(&account, PointDelta::season(10))
            .await
            .unwrap());
        assert!(!repo
            .apply_point_delta(&account, PointDelta::season(i64::MAX))
            .await
            .unwrap());
        assert!(!repo
            .apply_point_delta(&account, PointDelta::member(i64::MIN))
            .await
            .unwrap());

        let player = repo.get_player(&account).await.unwrap().unwrap();
        assert_eq!(player.season_point_total, POINT_MAX - 5);
        let ranked = repo
            .query_players_by_season_points(None, &[], 10)
            .await
            .unwrap();
        assert_eq!(ranked, vec![(account, POINT_MAX - 5)]);
    }

    #[tokio::test]
    async fn test_rejected_delta_does_not_create_player() {
        let (repo, _temp) = setup_repo().await;
        let account = AccountId::new(1003);

        let applied = repo
            .apply_point_delta(&account, PointDelta::season(-1))
            .await
            .unwrap();
        assert!(!applied);
        assert!(!repo.player_exists(&account).await.unwrap());
    }

    #[tokio::test]
    async fn test_record_match_clamps_conduct() {
        let (repo, _temp) = setup_repo().await;
        let account = AccountId::new(1004);

        let win = MatchResult {
            is_winner: true,
            season_points_earned: Some(42.7),
            disconnected: false,
        };
        let player = repo.record_match(&account, &win, Utc::now()).await.unwrap();
        assert_eq!(player.match_count, 1);
        assert_eq!(player.win_count, 1);
        assert_eq!(player.season_point_total, 42);
        assert_eq!(player.conduct_point, 100);
        assert!(player.last_match_time.is_some());

        let dc = MatchResult {
            is_winner: false,
            season_points_earned: Some(f64::NAN),
            disconnected: true,
        };
        let mut player = player;
        for _ in 0..25 {
            player = repo.record_match(&account, &dc, Utc::now()).await.unwrap();
        }
        assert_eq!(player.match_count, 26);
        assert_eq!(player.disconnect_count, 25);
        assert_eq!(player.season_point_total, 42);
        assert_eq!(player.conduct_point, 0);
    }

    #[tokio::test]
    async fn test_query_players_by_season_points() {
        let (repo, _temp) = setup_repo().await;
        for (id, points) in [(1, 300), (2, 100), (3, 200), (4, 200), (5, 50)] {
            repo.apply_point_delta(&AccountId::new(id), PointDelta::season(points))
                .await
                .unwrap();
        }

        let top = repo
            .query_players_by_season_points(None, &[AccountId::new(1)], 3)
            .await
            .unwrap();
        let ids: Vec<_> = top.iter().map(|(a, _)| a.as_str().to_string()).collect();
        assert_eq!(ids, vec!["3", "4", "2"]);

        let below = repo
            .query_players_by_season_points(Some(200), &[], 10)
            .await
            .unwrap();
        let scores: Vec<_> = below.iter().map(|(_, s)| *s).collect();
        assert_eq!(scores, vec![100, 50]);
    }
}
