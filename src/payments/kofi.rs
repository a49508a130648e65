//! Ko-fi webhook.
//!
//! Delivered form-encoded with a single `data` field holding a JSON document.

use super::{LineItem, PayloadError, PaymentEvent};
use crate::domain::Provider;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;

/// Catalog product id used for plain donations.
pub const DONATION_PRODUCT: &str = "donation";
/// Catalog product id used for subscriptions without a tier name.
pub const SUBSCRIPTION_PRODUCT: &str = "subscription";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum KofiEventType {
    Donation,
    Subscription,
    #[serde(rename = "Shop Order")]
    ShopOrder,
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct Message {
    #[serde(default)]
    verification_token: String,
    message_id: String,
    #[serde(rename = "type")]
    kind: KofiEventType,
    #[serde(default)]
    from_name: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    amount: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    currency: Option<String>,
    #[serde(default)]
    is_first_subscription_payment: bool,
    #[serde(default)]
    tier_name: Option<String>,
    #[serde(default)]
    shop_items: Option<Vec<ShopItem>>,
}

#[derive(Debug, Deserialize)]
struct ShopItem {
    direct_link_code: String,
    #[serde(default = "one")]
    quantity: i64,
}

fn one() -> i64 {
    1
}

/// A parsed Ko-fi notification. The token is checked by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KofiNotice {
    pub verification_token: String,
    pub kind: KofiEventType,
    pub event: PaymentEvent,
}

/// Parse the JSON carried in the `data` form field.
pub fn parse(data: &str) -> Result<KofiNotice, PayloadError> {
    let message: Message = serde_json::from_str(data)?;

    let transaction_id = message.message_id.trim().to_string();
    if transaction_id.is_empty() {
        return Err(PayloadError::InvalidEnvelope("missing message_id".to_string()));
    }

    let amount = match message.amount.as_deref().map(str::trim) {
        None | Some("") => Decimal::ZERO,
        Some(s) => Decimal::from_str(s)
            .map_err(|e| PayloadError::Malformed(format!("amount: {}", e)))?,
    };

    let line_items = match message.kind {
        KofiEventType::Donation => vec![LineItem {
            product_id: DONATION_PRODUCT.to_string(),
            months: 0,
            units: amount.floor().to_i64().unwrap_or(0),
        }],
        KofiEventType::Subscription => vec![LineItem {
            product_id: message
                .tier_name
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .unwrap_or(SUBSCRIPTION_PRODUCT)
                .to_string(),
            months: 1,
            units: 1,
        }],
        KofiEventType::ShopOrder => message
            .shop_items
            .unwrap_or_default()
            .into_iter()
            .map(|item| LineItem {
                product_id: item.direct_link_code.trim().to_string(),
                months: item.quantity,
                units: item.quantity,
            })
            .collect(),
        KofiEventType::Other => Vec::new(),
    };

    let account_refs = [message.message, message.from_name]
        .into_iter()
        .flatten()
        .collect();

    Ok(KofiNotice {
        verification_token: message.verification_token,
        kind: message.kind,
        event: PaymentEvent {
            provider: Provider::Kofi,
            transaction_id,
            contact_key: message
                .email
                .map(|e| e.trim().to_ascii_lowercase())
                .filter(|e| !e.is_empty()),
            account_refs,
            line_items,
            amount,
            currency: message.currency.unwrap_or_else(|| "USD".to_string()),
            first_payment: message.is_first_subscription_payment,
            raw_payload: data.to_string(),
        },
    })
}
