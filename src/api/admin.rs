use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::api::{parse_account, require_admin, AppState};
use crate::domain::{Player, Provider};
use crate::error::AppError;
use crate::orchestration::{IngestOutcome, Rejection};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AfdianReconcileRequest {
    pub transaction_id: String,
    pub account_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KofiReconcileRequest {
    pub transaction_id: Option<String>,
    pub contact_key: Option<String>,
    pub account_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointAdjustmentRequest {
    pub season_point: Option<i64>,
    pub member_point: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciledEntry {
    pub transaction_id: String,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub products: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileResponse {
    pub account_id: String,
    pub orders: Vec<ReconciledEntry>,
}

pub async fn reconcile_afdian(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<AfdianReconcileRequest>,
) -> Result<Json<ReconcileResponse>, AppError> {
    require_admin(&headers, &state.config)?;
    let account = parse_account(&request.account_id)?;
    let transaction_id = non_empty(&request.transaction_id, "transactionId")?;

    let outcome = state
        .ingestor
        .reconcile_order(Provider::Afdian, transaction_id, &account, Utc::now())
        .await?;

    Ok(Json(ReconcileResponse {
        account_id: account.to_string(),
        orders: vec![entry(transaction_id.to_string(), outcome)],
    }))
}

/// Reconcile one order by transaction id, or every unresolved order of a contact.
pub async fn reconcile_kofi(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<KofiReconcileRequest>,
) -> Result<Json<ReconcileResponse>, AppError> {
    require_admin(&headers, &state.config)?;
    let account = parse_account(&request.account_id)?;
    let now = Utc::now();

    let orders = if let Some(transaction_id) = request.transaction_id.as_deref() {
        let transaction_id = non_empty(transaction_id, "transactionId")?;
        let outcome = state
            .ingestor
            .reconcile_order(Provider::Kofi, transaction_id, &account, now)
            .await?;
        vec![entry(transaction_id.to_string(), outcome)]
    } else if let Some(contact_key) = request.contact_key.as_deref() {
        let contact_key = non_empty(contact_key, "contactKey")?.to_ascii_lowercase();
        state
            .ingestor
            .reconcile_contact(Provider::Kofi, &contact_key, &account, now)
            .await?
            .into_iter()
            .map(|r| entry(r.transaction_id, r.outcome))
            .collect()
    } else {
        return Err(AppError::BadRequest(
            "transactionId or contactKey is required".to_string(),
        ));
    };

    Ok(Json(ReconcileResponse {
        account_id: account.to_string(),
        orders,
    }))
}

pub async fn adjust_points(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(request): Json<PointAdjustmentRequest>,
) -> Result<Json<Player>, AppError> {
    require_admin(&headers, &state.config)?;
    let account = parse_account(&id)?;

    let player = state
        .players
        .apply_point_delta(&account, request.season_point, request.member_point)
        .await?;
    tracing::info!(
        account = %account,
        season = ?request.season_point,
        member = ?request.member_point,
        "admin point adjustment"
    );
    Ok(Json(player))
}

fn non_empty<'a>(value: &'a str, field: &str) -> Result<&'a str, AppError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::BadRequest(format!("{} must not be empty", field)));
    }
    Ok(trimmed)
}

fn entry(transaction_id: String, outcome: IngestOutcome) -> ReconciledEntry {
    let (status, products) = match outcome {
        IngestOutcome::Activated { products, .. } => ("success", products),
        IngestOutcome::AlreadyProcessed => ("already_processed", Vec::new()),
        IngestOutcome::Rejected(Rejection::UnresolvedAccount) => ("invalid_steam_id", Vec::new()),
        IngestOutcome::Rejected(Rejection::UnsupportedProduct(_)) => ("failed", Vec::new()),
    };
    ReconciledEntry {
        transaction_id,
        status,
        products,
    }
}
