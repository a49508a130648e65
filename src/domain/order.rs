//! Persisted payment orders and provider contact links.

use crate::domain::{AccountId, Membership, PointDelta, Provider};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Processing state of a payment order.
///
/// `Pending` marks an order whose activation is owned by exactly one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Failed,
    Succeeded,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Failed => "failed",
            OrderStatus::Succeeded => "succeeded",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "failed" => Ok(OrderStatus::Failed),
            "succeeded" => Ok(OrderStatus::Succeeded),
            _ => Err(()),
        }
    }
}

/// One record per `(provider, transaction_id)`; the idempotency anchor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentOrder {
    pub provider: Provider,
    pub transaction_id: String,
    pub raw_payload: String,
    /// Hex SHA-256 of `raw_payload`.
    pub payload_digest: String,
    pub contact_key: Option<String>,
    pub account_id: Option<AccountId>,
    /// Classification label, e.g. `premium_membership x1`.
    pub product: Option<String>,
    pub amount: Decimal,
    pub currency: String,
    pub status: OrderStatus,
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PaymentOrder {
    pub fn success(&self) -> bool {
        self.status == OrderStatus::Succeeded
    }

    /// Compute the digest stored alongside a raw payload.
    pub fn digest(raw_payload: &str) -> String {
        use sha2::{Digest, Sha256};

        hex::encode(Sha256::digest(raw_payload.as_bytes()))
    }
}

/// Final state written when an order finishes processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderOutcome {
    pub status: OrderStatus,
    pub account_id: Option<AccountId>,
    pub product: Option<String>,
    pub failure_reason: Option<String>,
}

/// Every ledger change a settled order makes, applied in one transaction
/// together with marking the order succeeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderSettlement {
    pub account_id: AccountId,
    /// Membership state after all purchased durations.
    pub membership: Option<Membership>,
    pub points: PointDelta,
    pub reset_properties: bool,
}

/// Maps a provider contact key (email or provider user id) to a resolved account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderAccountLink {
    pub provider: Provider,
    pub contact_key: String,
    pub account_id: AccountId,
}
