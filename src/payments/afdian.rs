//! Afdian order webhook.
//!
//! Envelope: `{"ec": 200, "em": "", "data": {"type": "order", "order": {...}}}`.
//! Only orders with `status == 2` are settled.

use super::{LineItem, PayloadError, PaymentEvent};
use crate::domain::Provider;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;

const ENVELOPE_OK: i64 = 200;
const STATUS_SETTLED: i64 = 2;
const CURRENCY: &str = "CNY";

#[derive(Debug, Deserialize)]
struct Envelope {
    ec: i64,
    #[serde(default)]
    em: String,
    data: Option<EnvelopeData>,
}

#[derive(Debug, Deserialize)]
struct EnvelopeData {
    order: Option<Order>,
}

#[derive(Debug, Deserialize)]
struct Order {
    out_trade_no: String,
    #[serde(default)]
    user_id: String,
    #[serde(default)]
    plan_id: String,
    #[serde(default)]
    month: i64,
    #[serde(default)]
    total_amount: String,
    status: i64,
    #[serde(default)]
    remark: String,
    #[serde(default)]
    sku_detail: Vec<Sku>,
}

#[derive(Debug, Deserialize)]
struct Sku {
    #[serde(default)]
    count: i64,
}

/// A parsed Afdian notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AfdianNotice {
    pub settled: bool,
    pub event: PaymentEvent,
}

pub fn parse(raw: &str) -> Result<AfdianNotice, PayloadError> {
    let envelope: Envelope = serde_json::from_str(raw)?;
    if envelope.ec != ENVELOPE_OK {
        return Err(PayloadError::InvalidEnvelope(format!(
            "ec {} ({})",
            envelope.ec, envelope.em
        )));
    }

    let order = envelope
        .data
        .and_then(|d| d.order)
        .ok_or_else(|| PayloadError::InvalidEnvelope("missing order".to_string()))?;

    let transaction_id = order.out_trade_no.trim().to_string();
    if transaction_id.is_empty() {
        return Err(PayloadError::InvalidEnvelope(
            "missing out_trade_no".to_string(),
        ));
    }

    let amount = if order.total_amount.trim().is_empty() {
        Decimal::ZERO
    } else {
        Decimal::from_str(order.total_amount.trim())
            .map_err(|e| PayloadError::Malformed(format!("total_amount: {}", e)))?
    };

    let sku_units: i64 = order.sku_detail.iter().map(|s| s.count).sum();
    let units = if sku_units > 0 { sku_units } else { order.month };

    let contact_key = Some(order.user_id.trim().to_string()).filter(|s| !s.is_empty());

    Ok(AfdianNotice {
        settled: order.status == STATUS_SETTLED,
        event: PaymentEvent {
            provider: Provider::Afdian,
            transaction_id,
            contact_key,
            account_refs: vec![order.remark],
            line_items: vec![LineItem {
                product_id: order.plan_id.trim().to_string(),
                months: order.month,
                units,
            }],
            amount,
            currency: CURRENCY.to_string(),
            first_payment: false,
            raw_payload: raw.to_string(),
        },
    })
}
