//! Outbound purchase notifications.
//!
//! Delivery is fire-and-forget from the ledger's point of view: a failed
//! notification is logged and never rolls back the purchase that caused it.

use crate::domain::{AccountId, Provider};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

pub mod http;
pub mod mock;

pub use http::HttpAnalyticsSink;
pub use mock::MockAnalytics;

/// A completed purchase as reported to analytics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseEvent {
    pub event_id: Uuid,
    pub provider: Provider,
    pub transaction_id: String,
    pub account_id: AccountId,
    /// Classification labels of the purchased lines.
    pub products: Vec<String>,
    pub amount: Decimal,
    pub currency: String,
    pub first_payment: bool,
    pub occurred_at: DateTime<Utc>,
}

#[async_trait]
pub trait AnalyticsSink: Send + Sync + fmt::Debug {
    async fn track_purchase(&self, event: &PurchaseEvent) -> Result<(), AnalyticsError>;
}

#[derive(Debug, Clone, Error)]
pub enum AnalyticsError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("HTTP error {status}: {message}")]
    Http { status: u16, message: String },
    #[error("Rate limited")]
    RateLimited,
}

/// Sink used when no analytics endpoint is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopAnalytics;

#[async_trait]
impl AnalyticsSink for NoopAnalytics {
    async fn track_purchase(&self, event: &PurchaseEvent) -> Result<(), AnalyticsError> {
        tracing::debug!(
            transaction_id = %event.transaction_id,
            "analytics disabled, dropping purchase event"
        );
        Ok(())
    }
}

/// Send `event` on a background task; failures are only logged.
pub fn spawn_track(sink: Arc<dyn AnalyticsSink>, event: PurchaseEvent) {
    tokio::spawn(async move {
        if let Err(e) = sink.track_purchase(&event).await {
            tracing::warn!(
                provider = %event.provider,
                transaction_id = %event.transaction_id,
                error = %e,
                "failed to deliver purchase event"
            );
        }
    });
}
