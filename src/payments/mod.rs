//! Provider payment notifications, normalized into [`PaymentEvent`].
//!
//! Each provider module turns its own wire format into the same event shape;
//! the ingestor never looks at provider-specific fields.

use crate::domain::Provider;
use rust_decimal::Decimal;
use thiserror::Error;

pub mod afdian;
pub mod catalog;
pub mod kofi;

pub use catalog::{CatalogError, ProductCatalog, UnsupportedProduct};

/// A purchased product line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineItem {
    pub product_id: String,
    /// Membership months bought, when the product is a membership.
    pub months: i64,
    /// Units bought, when the product is a point package.
    pub units: i64,
}

/// Provider-independent view of one payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentEvent {
    pub provider: Provider,
    pub transaction_id: String,
    /// Email or provider user id; key for [`crate::domain::ProviderAccountLink`].
    pub contact_key: Option<String>,
    /// Free-text fields that may carry an account id, in priority order.
    pub account_refs: Vec<String>,
    pub line_items: Vec<LineItem>,
    pub amount: Decimal,
    pub currency: String,
    pub first_payment: bool,
    /// Provider payload as received, persisted with the order.
    pub raw_payload: String,
}

impl PaymentEvent {
    /// Whether any reference field parses as an account id.
    pub fn carries_account_ref(&self) -> bool {
        self.account_refs
            .iter()
            .any(|r| crate::domain::AccountId::parse_reference(r).is_some())
    }
}

#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("malformed payload: {0}")]
    Malformed(String),
    #[error("invalid envelope: {0}")]
    InvalidEnvelope(String),
}

impl From<serde_json::Error> for PayloadError {
    fn from(err: serde_json::Error) -> Self {
        PayloadError::Malformed(err.to_string())
    }
}

/// Re-parse a payload stored with an order.
pub fn parse_stored(provider: Provider, raw_payload: &str) -> Result<PaymentEvent, PayloadError> {
    match provider {
        Provider::Afdian => afdian::parse(raw_payload).map(|notice| notice.event),
        Provider::Kofi => kofi::parse(raw_payload).map(|notice| notice.event),
    }
}
