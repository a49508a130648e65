//! Payment order and provider link operations.
//!
//! `create_order_if_absent` and `claim_failed_order` are the idempotency
//! primitives: each succeeds for at most one concurrent caller.

use crate::domain::{
    AccountId, OrderOutcome, OrderSettlement, OrderStatus, PaymentOrder, Provider,
    ProviderAccountLink,
};
use rust_decimal::Decimal;
use sqlx::sqlite::{SqliteConnection, SqliteRow};
use sqlx::Row;
use std::str::FromStr;

use super::memberships::save_membership_conn;
use super::players::{apply_point_delta_conn, ensure_player};
use super::properties::delete_properties_conn;
use super::{decode_error, from_ms, now_ms, Repository};

const ORDER_COLUMNS: &str = "provider, transaction_id, raw_payload, payload_digest, contact_key, \
     account_id, product, amount, currency, status, failure_reason, created_at, updated_at";

impl Repository {
    /// Get an order by its provider-scoped transaction id.
    ///
    /// # Errors
    /// Returns an error if the query fails or a stored value is malformed.
    pub async fn get_order(
        &self,
        provider: Provider,
        transaction_id: &str,
    ) -> Result<Option<PaymentOrder>, sqlx::Error> {
        let sql = format!(
            "SELECT {} FROM payment_orders WHERE provider = ? AND transaction_id = ?",
            ORDER_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(provider.as_str())
            .bind(transaction_id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(order_from_row).transpose()
    }

    /// Insert the order unless one with the same key exists.
    ///
    /// Returns `true` if this call created the record.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub async fn create_order_if_absent(&self, order: &PaymentOrder) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO payment_orders (
                provider, transaction_id, raw_payload, payload_digest, contact_key,
                account_id, product, amount, currency, status, failure_reason,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(provider, transaction_id) DO NOTHING
            "#,
        )
        .bind(order.provider.as_str())
        .bind(order.transaction_id.as_str())
        .bind(order.raw_payload.as_str())
        .bind(order.payload_digest.as_str())
        .bind(order.contact_key.as_deref())
        .bind(order.account_id.as_ref().map(|a| a.as_str()))
        .bind(order.product.as_deref())
        .bind(order.amount.to_string())
        .bind(order.currency.as_str())
        .bind(order.status.as_str())
        .bind(order.failure_reason.as_deref())
        .bind(order.created_at.timestamp_millis())
        .bind(order.updated_at.timestamp_millis())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Move a failed order back to pending. Only one caller can win the claim.
    ///
    /// # Errors
    /// Returns an error if the update fails.
    pub async fn claim_failed_order(
        &self,
        provider: Provider,
        transaction_id: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE payment_orders SET status = 'pending', updated_at = ?
            WHERE provider = ? AND transaction_id = ? AND status = 'failed'
            "#,
        )
        .bind(now_ms())
        .bind(provider.as_str())
        .bind(transaction_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Record the final outcome of a pending order.
    ///
    /// # Errors
    /// Returns an error if the update fails.
    pub async fn finish_order(
        &self,
        provider: Provider,
        transaction_id: &str,
        outcome: &OrderOutcome,
    ) -> Result<(), sqlx::Error> {
        let mut conn = self.pool.acquire().await?;
        finish_order_conn(&mut conn, provider, transaction_id, outcome).await?;
        Ok(())
    }

    /// Apply every effect of a pending order and mark it succeeded, atomically.
    ///
    /// Returns `false` and changes nothing if the point credit would leave the
    /// balance bounds. An error also leaves everything unchanged, so a failed
    /// order never carries partially applied effects.
    ///
    /// # Errors
    /// Returns an error if the transaction fails, or `RowNotFound` if the order
    /// is not pending.
    pub async fn settle_order(
        &self,
        provider: Provider,
        transaction_id: &str,
        settlement: &OrderSettlement,
        product: &str,
    ) -> Result<bool, sqlx::Error> {
        let account = &settlement.account_id;
        let mut tx = self.pool.begin().await?;
        ensure_player(&mut tx, account).await?;

        if !settlement.points.is_zero()
            && !apply_point_delta_conn(&mut tx, account, settlement.points).await?
        {
            tx.rollback().await?;
            return Ok(false);
        }
        if let Some(membership) = &settlement.membership {
            save_membership_conn(&mut tx, membership).await?;
        }
        if settlement.reset_properties {
            delete_properties_conn(&mut tx, account).await?;
        }

        let finished = finish_order_conn(
            &mut tx,
            provider,
            transaction_id,
            &OrderOutcome {
                status: OrderStatus::Succeeded,
                account_id: Some(account.clone()),
                product: Some(product.to_string()),
                failure_reason: None,
            },
        )
        .await?;
        if !finished {
            // only the request holding the pending order may settle it
            tx.rollback().await?;
            return Err(sqlx::Error::RowNotFound);
        }
        tx.commit().await?;
        Ok(true)
    }

    /// Failed orders from one contact that never resolved to an account, oldest first.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn query_unresolved_orders_by_contact(
        &self,
        provider: Provider,
        contact_key: &str,
    ) -> Result<Vec<PaymentOrder>, sqlx::Error> {
        let sql = format!(
            r#"
            SELECT {} FROM payment_orders
            WHERE provider = ? AND contact_key = ? AND status = 'failed' AND account_id IS NULL
            ORDER BY created_at ASC, transaction_id ASC
            "#,
            ORDER_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(provider.as_str())
            .bind(contact_key)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(order_from_row).collect()
    }

    /// Look up the account previously linked to a provider contact key.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn get_account_link(
        &self,
        provider: Provider,
        contact_key: &str,
    ) -> Result<Option<AccountId>, sqlx::Error> {
        let row: Option<(String,)> = sqlx::query_as(
            "SELECT account_id FROM provider_account_links WHERE provider = ? AND contact_key = ?",
        )
        .bind(provider.as_str())
        .bind(contact_key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(id,)| AccountId::from_stored(id)))
    }

    /// Create or repoint a contact key link.
    ///
    /// # Errors
    /// Returns an error if the upsert fails.
    pub async fn upsert_account_link(&self, link: &ProviderAccountLink) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO provider_account_links (provider, contact_key, account_id, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(provider, contact_key) DO UPDATE SET
                account_id = excluded.account_id,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(link.provider.as_str())
        .bind(link.contact_key.as_str())
        .bind(link.account_id.as_str())
        .bind(now_ms())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

pub(super) async fn finish_order_conn(
    conn: &mut SqliteConnection,
    provider: Provider,
    transaction_id: &str,
    outcome: &OrderOutcome,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE payment_orders SET
            status = ?,
            account_id = COALESCE(?, account_id),
            product = COALESCE(?, product),
            failure_reason = ?,
            updated_at = ?
        WHERE provider = ? AND transaction_id = ? AND status = 'pending'
        "#,
    )
    .bind(outcome.status.as_str())
    .bind(outcome.account_id.as_ref().map(|a| a.as_str()))
    .bind(outcome.product.as_deref())
    .bind(outcome.failure_reason.as_deref())
    .bind(now_ms())
    .bind(provider.as_str())
    .bind(transaction_id)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() > 0)
}

fn order_from_row(row: &SqliteRow) -> Result<PaymentOrder, sqlx::Error> {
    let provider: String = row.get("provider");
    let status: String = row.get("status");
    let amount: String = row.get("amount");
    let account_id: Option<String> = row.get("account_id");

    Ok(PaymentOrder {
        provider: Provider::from_str(&provider).map_err(|_| decode_error("provider", &provider))?,
        transaction_id: row.get("transaction_id"),
        raw_payload: row.get("raw_payload"),
        payload_digest: row.get("payload_digest"),
        contact_key: row.get("contact_key"),
        account_id: account_id.map(AccountId::from_stored),
        product: row.get("product"),
        amount: Decimal::from_str(&amount).map_err(|_| decode_error("amount", &amount))?,
        currency: row.get("currency"),
        status: OrderStatus::from_str(&status).map_err(|_| decode_error("status", &status))?,
        failure_reason: row.get("failure_reason"),
        created_at: from_ms(row.get("created_at")),
        updated_at: from_ms(row.get("updated_at")),
    })
}
