//! Payment event ingestion.
//!
//! Per event: dedup against the stored order, resolve the account, classify
//! every line, then settle. Settlement applies every effect and marks the order
//! succeeded in one transaction, so a failed order never carries partial
//! effects. Exactly one request owns an order while it is `pending`; a request
//! that cannot create or claim the order does nothing.

use super::{LedgerError, MembershipLedger, PlayerLedger};
use crate::analytics::{spawn_track, AnalyticsSink, PurchaseEvent};
use crate::db::Repository;
use crate::domain::{
    AccountId, OrderOutcome, OrderSettlement, OrderStatus, PaymentOrder, PointDelta,
    ProductEffect, Provider, ProviderAccountLink, Tier,
};
use crate::payments::{
    parse_stored, PayloadError, PaymentEvent, ProductCatalog, UnsupportedProduct,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    Activated {
        account_id: AccountId,
        products: Vec<String>,
    },
    /// Succeeded earlier, or owned by another request.
    AlreadyProcessed,
    Rejected(Rejection),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    UnresolvedAccount,
    UnsupportedProduct(UnsupportedProduct),
}

/// Outcome for one order replayed by contact reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciledOrder {
    pub transaction_id: String,
    pub outcome: IngestOutcome,
}

#[derive(Debug, Error)]
pub enum IngestionError {
    #[error("account {0} does not exist")]
    UnresolvedAccount(AccountId),
    #[error(transparent)]
    UnsupportedProduct(#[from] UnsupportedProduct),
    #[error("order {provider}/{transaction_id} not found")]
    OrderNotFound {
        provider: Provider,
        transaction_id: String,
    },
    #[error("order {provider}/{transaction_id} is being processed")]
    OrderInProgress {
        provider: Provider,
        transaction_id: String,
    },
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    Payload(#[from] PayloadError),
    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

#[derive(Clone)]
pub struct Ingestor {
    repo: Arc<Repository>,
    catalog: Arc<ProductCatalog>,
    players: PlayerLedger,
    memberships: MembershipLedger,
    analytics: Arc<dyn AnalyticsSink>,
}

impl Ingestor {
    pub fn new(
        repo: Arc<Repository>,
        catalog: Arc<ProductCatalog>,
        players: PlayerLedger,
        memberships: MembershipLedger,
        analytics: Arc<dyn AnalyticsSink>,
    ) -> Self {
        Self {
            repo,
            catalog,
            players,
            memberships,
            analytics,
        }
    }

    /// Ingest one provider event.
    ///
    /// Business failures are recorded on the order and returned as
    /// `Rejected`; only store failures surface as errors.
    pub async fn ingest(
        &self,
        event: &PaymentEvent,
        now: DateTime<Utc>,
    ) -> Result<IngestOutcome, IngestionError> {
        let provider = event.provider;
        let tx_id = event.transaction_id.as_str();

        match self.repo.get_order(provider, tx_id).await? {
            Some(order) if order.success() => {
                tracing::info!(%provider, transaction_id = tx_id, "duplicate delivery of settled order");
                return Ok(IngestOutcome::AlreadyProcessed);
            }
            Some(order)
                if order.status == OrderStatus::Failed
                    && order.account_id.is_none()
                    && !event.carries_account_ref() =>
            {
                if !self.repo.claim_failed_order(provider, tx_id).await? {
                    return Ok(IngestOutcome::AlreadyProcessed);
                }
                tracing::info!(%provider, transaction_id = tx_id, "retrying unresolved order");
            }
            Some(order) => {
                tracing::info!(
                    %provider,
                    transaction_id = tx_id,
                    status = %order.status,
                    "order already handled"
                );
                return Ok(IngestOutcome::AlreadyProcessed);
            }
            None => {
                if !self.repo.create_order_if_absent(&pending_order(event, now)).await? {
                    tracing::info!(%provider, transaction_id = tx_id, "lost order creation race");
                    return Ok(IngestOutcome::AlreadyProcessed);
                }
            }
        }

        let account = self.resolve_account(event).await?;
        self.process_claimed(event, account, now).await
    }

    /// Replay a stored order with an operator-supplied account.
    pub async fn reconcile_order(
        &self,
        provider: Provider,
        transaction_id: &str,
        account: &AccountId,
        now: DateTime<Utc>,
    ) -> Result<IngestOutcome, IngestionError> {
        let order = self
            .repo
            .get_order(provider, transaction_id)
            .await?
            .ok_or_else(|| IngestionError::OrderNotFound {
                provider,
                transaction_id: transaction_id.to_string(),
            })?;

        if order.success() {
            return Ok(IngestOutcome::AlreadyProcessed);
        }
        if !self.players.player_exists(account).await? {
            return Err(IngestionError::UnresolvedAccount(account.clone()));
        }
        if !self.repo.claim_failed_order(provider, transaction_id).await? {
            return Err(IngestionError::OrderInProgress {
                provider,
                transaction_id: transaction_id.to_string(),
            });
        }

        tracing::info!(%provider, transaction_id, account = %account, "reconciling order");

        let event = match parse_stored(provider, &order.raw_payload) {
            Ok(event) => event,
            Err(e) => {
                self.finish_failed(provider, transaction_id, Some(account), None, e.to_string())
                    .await?;
                return Err(e.into());
            }
        };

        match self.process_claimed(&event, Some(account.clone()), now).await? {
            IngestOutcome::Rejected(Rejection::UnsupportedProduct(unsupported)) => {
                Err(unsupported.into())
            }
            outcome => Ok(outcome),
        }
    }

    /// Link `contact_key` to `account` and replay every unresolved order from it.
    pub async fn reconcile_contact(
        &self,
        provider: Provider,
        contact_key: &str,
        account: &AccountId,
        now: DateTime<Utc>,
    ) -> Result<Vec<ReconciledOrder>, IngestionError> {
        if !self.players.player_exists(account).await? {
            return Err(IngestionError::UnresolvedAccount(account.clone()));
        }

        self.repo
            .upsert_account_link(&ProviderAccountLink {
                provider,
                contact_key: contact_key.to_string(),
                account_id: account.clone(),
            })
            .await?;

        let orders = self
            .repo
            .query_unresolved_orders_by_contact(provider, contact_key)
            .await?;

        let mut reconciled = Vec::with_capacity(orders.len());
        for order in orders {
            let tx_id = order.transaction_id.as_str();
            if !self.repo.claim_failed_order(provider, tx_id).await? {
                continue;
            }
            let outcome = match parse_stored(provider, &order.raw_payload) {
                Ok(event) => self.process_claimed(&event, Some(account.clone()), now).await?,
                Err(e) => {
                    tracing::warn!(%provider, transaction_id = tx_id, error = %e, "stored payload unreadable");
                    self.finish_failed(provider, tx_id, Some(account), None, e.to_string())
                        .await?;
                    continue;
                }
            };
            reconciled.push(ReconciledOrder {
                transaction_id: order.transaction_id.clone(),
                outcome,
            });
        }

        tracing::info!(
            %provider,
            contact_key,
            account = %account,
            replayed = reconciled.len(),
            "contact reconciled"
        );
        Ok(reconciled)
    }

    /// Explicit reference to an existing player first, then the contact link.
    async fn resolve_account(
        &self,
        event: &PaymentEvent,
    ) -> Result<Option<AccountId>, IngestionError> {
        for candidate in event
            .account_refs
            .iter()
            .filter_map(|r| AccountId::parse_reference(r))
        {
            if self.players.player_exists(&candidate).await? {
                return Ok(Some(candidate));
            }
        }

        if let Some(contact_key) = event.contact_key.as_deref() {
            return Ok(self.repo.get_account_link(event.provider, contact_key).await?);
        }
        Ok(None)
    }

    /// Resolution onwards, for an order this request has created or claimed.
    async fn process_claimed(
        &self,
        event: &PaymentEvent,
        account: Option<AccountId>,
        now: DateTime<Utc>,
    ) -> Result<IngestOutcome, IngestionError> {
        let provider = event.provider;
        let tx_id = event.transaction_id.as_str();

        let Some(account) = account else {
            tracing::warn!(
                %provider,
                transaction_id = tx_id,
                contact_key = ?event.contact_key,
                "payment has no resolvable account"
            );
            self.finish_failed(provider, tx_id, None, None, "unresolved account".to_string())
                .await?;
            return Ok(IngestOutcome::Rejected(Rejection::UnresolvedAccount));
        };

        let effects = match self.catalog.classify_all(provider, &event.line_items) {
            Ok(effects) => effects,
            Err(unsupported) => {
                tracing::warn!(
                    %provider,
                    transaction_id = tx_id,
                    product_id = %unsupported.product_id,
                    reason = unsupported.reason,
                    "unsupported product"
                );
                self.finish_failed(provider, tx_id, Some(&account), None, unsupported.to_string())
                    .await?;
                return Ok(IngestOutcome::Rejected(Rejection::UnsupportedProduct(
                    unsupported,
                )));
            }
        };
        let products: Vec<String> = effects.iter().map(ToString::to_string).collect();
        let label = products.join(", ");

        let settled = match self.plan_settlement(&account, &effects, now).await {
            Ok(settlement) => {
                self.repo
                    .settle_order(provider, tx_id, &settlement, &label)
                    .await
            }
            Err(e) => {
                self.fail_activation(provider, tx_id, &account, &label, &e).await;
                return Err(e.into());
            }
        };
        match settled {
            Ok(true) => {}
            Ok(false) => {
                let e = LedgerError::BalanceLimitExceeded;
                self.fail_activation(provider, tx_id, &account, &label, &e).await;
                return Err(e.into());
            }
            Err(e) => {
                let e = LedgerError::Db(e);
                self.fail_activation(provider, tx_id, &account, &label, &e).await;
                return Err(e.into());
            }
        }

        if let Some(contact_key) = event.contact_key.as_deref() {
            self.repo
                .upsert_account_link(&ProviderAccountLink {
                    provider,
                    contact_key: contact_key.to_string(),
                    account_id: account.clone(),
                })
                .await?;
        }

        tracing::info!(
            %provider,
            transaction_id = tx_id,
            account = %account,
            products = %label,
            amount = %event.amount,
            "payment activated"
        );

        spawn_track(
            self.analytics.clone(),
            PurchaseEvent {
                event_id: Uuid::new_v4(),
                provider,
                transaction_id: event.transaction_id.clone(),
                account_id: account.clone(),
                products: products.clone(),
                amount: event.amount,
                currency: event.currency.clone(),
                first_payment: event.first_payment,
                occurred_at: now,
            },
        );

        Ok(IngestOutcome::Activated {
            account_id: account,
            products,
        })
    }

    /// Fold every effect into one settlement against the current state.
    async fn plan_settlement(
        &self,
        account: &AccountId,
        effects: &[ProductEffect],
        now: DateTime<Utc>,
    ) -> Result<OrderSettlement, LedgerError> {
        let mut membership = self.memberships.get_membership(account).await?;
        let mut settlement = OrderSettlement {
            account_id: account.clone(),
            membership: None,
            points: PointDelta::default(),
            reset_properties: false,
        };

        for effect in effects {
            match *effect {
                ProductEffect::NormalMembership { months } => {
                    let (next, _) = self.memberships.plan_purchase(
                        account,
                        membership.as_ref(),
                        Tier::Normal,
                        months,
                        now,
                    )?;
                    membership = Some(next);
                    settlement.membership = membership.clone();
                }
                ProductEffect::PremiumMembership { months } => {
                    let (next, _) = self.memberships.plan_purchase(
                        account,
                        membership.as_ref(),
                        Tier::Premium,
                        months,
                        now,
                    )?;
                    membership = Some(next);
                    settlement.membership = membership.clone();
                }
                ProductEffect::PointPackage { points } => {
                    settlement.points = settlement
                        .points
                        .checked_add(PointDelta::member(points))
                        .ok_or(LedgerError::BalanceLimitExceeded)?;
                }
                ProductEffect::OneTimeReset => settlement.reset_properties = true,
            }
        }
        Ok(settlement)
    }

    /// Record a settlement failure; the caller returns the original error.
    async fn fail_activation(
        &self,
        provider: Provider,
        transaction_id: &str,
        account: &AccountId,
        label: &str,
        error: &LedgerError,
    ) {
        tracing::error!(%provider, transaction_id, error = %error, "activation failed");
        if let Err(finish_err) = self
            .finish_failed(provider, transaction_id, Some(account), Some(label), error.to_string())
            .await
        {
            tracing::error!(
                %provider,
                transaction_id,
                error = %finish_err,
                "could not record activation failure"
            );
        }
    }

    async fn finish_failed(
        &self,
        provider: Provider,
        transaction_id: &str,
        account: Option<&AccountId>,
        product: Option<&str>,
        reason: String,
    ) -> Result<(), sqlx::Error> {
        self.repo
            .finish_order(
                provider,
                transaction_id,
                &OrderOutcome {
                    status: OrderStatus::Failed,
                    account_id: account.cloned(),
                    product: product.map(str::to_string),
                    failure_reason: Some(reason),
                },
            )
            .await
    }
}

fn pending_order(event: &PaymentEvent, now: DateTime<Utc>) -> PaymentOrder {
    PaymentOrder {
        provider: event.provider,
        transaction_id: event.transaction_id.clone(),
        raw_payload: event.raw_payload.clone(),
        payload_digest: PaymentOrder::digest(&event.raw_payload),
        contact_key: event.contact_key.clone(),
        account_id: None,
        product: None,
        amount: event.amount,
        currency: event.currency.clone(),
        status: OrderStatus::Pending,
        failure_reason: None,
        created_at: now,
        updated_at: now,
    }
}
