//! Membership operations.

use crate::domain::{AccountId, Membership, PointDelta, Tier};
use chrono::NaiveDate;
use sqlx::sqlite::SqliteConnection;
use sqlx::Row;
use std::str::FromStr;

use super::players::{apply_point_delta_conn, ensure_player};
use super::{decode_error, now_ms, Repository};

const DATE_FORMAT: &str = "%Y-%m-%d";

impl Repository {
    /// Get the membership for an account.
    ///
    /// # Errors
    /// Returns an error if the query fails or a stored value is malformed.
    pub async fn get_membership(
        &self,
        account: &AccountId,
    ) -> Result<Option<Membership>, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT account_id, tier, expire_date, last_daily_grant_date
            FROM memberships
            WHERE account_id = ?
            "#,
        )
        .bind(account.as_str())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let tier: String = row.get("tier");
        let expire_date: String = row.get("expire_date");
        let last_grant: Option<String> = row.get("last_daily_grant_date");

        Ok(Some(Membership {
            account_id: AccountId::from_stored(row.get("account_id")),
            tier: Tier::from_str(&tier).map_err(|_| decode_error("tier", &tier))?,
            expire_date: parse_date(&expire_date)
                .ok_or_else(|| decode_error("expire_date", &expire_date))?,
            last_daily_grant_date: last_grant.as_deref().and_then(parse_date),
        }))
    }

    /// Write tier and expiry. Last writer wins; the daily grant marker is untouched.
    ///
    /// # Errors
    /// Returns an error if the upsert fails.
    pub async fn save_membership(&self, membership: &Membership) -> Result<(), sqlx::Error> {
        let mut conn = self.pool.acquire().await?;
        save_membership_conn(&mut conn, membership).await
    }

    /// Claim today's bonus and credit it in one transaction.
    ///
    /// Returns `false` if the bonus was already claimed on or after `today`, or if
    /// crediting it would pass the balance limit.
    ///
    /// # Errors
    /// Returns an error if the transaction fails.
    pub async fn grant_daily_bonus(
        &self,
        account: &AccountId,
        today: NaiveDate,
        bonus: i64,
    ) -> Result<bool, sqlx::Error> {
        let today = format_date(today);
        let mut tx = self.pool.begin().await?;

        let claimed = sqlx::query(
            r#"
            UPDATE memberships SET last_daily_grant_date = ?, updated_at = ?
            WHERE account_id = ?
              AND (last_daily_grant_date IS NULL OR last_daily_grant_date < ?)
            "#,
        )
        .bind(today.as_str())
        .bind(now_ms())
        .bind(account.as_str())
        .bind(today.as_str())
        .execute(&mut *tx)
        .await?
        .rows_affected()
            > 0;

        if !claimed {
            tx.rollback().await?;
            return Ok(false);
        }

        ensure_player(&mut tx, account).await?;
        if !apply_point_delta_conn(&mut tx, account, PointDelta::member(bonus)).await? {
            // balance at the limit; leave the day unclaimed
            tx.rollback().await?;
            return Ok(false);
        }
        tx.commit().await?;
        Ok(true)
    }
}

pub(super) async fn save_membership_conn(
    conn: &mut SqliteConnection,
    membership: &Membership,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO memberships (account_id, tier, expire_date, last_daily_grant_date, updated_at)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT(account_id) DO UPDATE SET
            tier = excluded.tier,
            expire_date = excluded.expire_date,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(membership.account_id.as_str())
    .bind(membership.tier.as_str())
    .bind(format_date(membership.expire_date))
    .bind(membership.last_daily_grant_date.map(format_date))
    .bind(now_ms())
    .execute(&mut *conn)
    .await?;

    Ok(())
}

fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, DATE_FORMAT).ok()
}
