//! Provider webhook endpoints.
//!
//! Business failures are answered with a success status and a failure marker in
//! the body; providers retry anything else, and retrying cannot fix them.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::{Form, Json};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::api::{tokens_match, AppState};
use crate::error::AppError;
use crate::orchestration::{IngestOutcome, IngestionError, LedgerError, Rejection};
use crate::payments::{afdian, kofi};

#[derive(Debug, Deserialize)]
pub struct AfdianQuery {
    pub token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct KofiForm {
    pub data: Option<String>,
}

pub async fn afdian_webhook(
    State(state): State<AppState>,
    Query(query): Query<AfdianQuery>,
    body: String,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let token = query
        .token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::Unauthorized("token is required".to_string()))?;
    if !tokens_match(&token, &state.config.afdian_webhook_token) {
        return Err(AppError::Forbidden("invalid token".to_string()));
    }

    let notice = match afdian::parse(&body) {
        Ok(notice) => notice,
        Err(e) => {
            tracing::warn!(error = %e, "rejected afdian payload");
            return Ok((
                StatusCode::BAD_REQUEST,
                Json(json!({"code": 400, "message": e.to_string()})),
            ));
        }
    };

    if !notice.settled {
        tracing::info!(
            transaction_id = %notice.event.transaction_id,
            "afdian order not settled, ignoring"
        );
        return Ok((
            StatusCode::OK,
            Json(json!({"code": 200, "message": "ignored"})),
        ));
    }

    let status = webhook_status(state.ingestor.ingest(&notice.event, Utc::now()).await)?;
    Ok((
        StatusCode::OK,
        Json(json!({"code": 200, "message": status})),
    ))
}

pub async fn kofi_webhook(
    State(state): State<AppState>,
    Form(form): Form<KofiForm>,
) -> Result<Json<Value>, AppError> {
    let data = form
        .data
        .ok_or_else(|| AppError::BadRequest("data field is required".to_string()))?;
    let notice = kofi::parse(&data).map_err(|e| AppError::BadRequest(e.to_string()))?;

    if !tokens_match(
        &notice.verification_token,
        &state.config.kofi_verification_token,
    ) {
        return Err(AppError::Unauthorized("invalid verification token".to_string()));
    }

    let status = webhook_status(state.ingestor.ingest(&notice.event, Utc::now()).await)?;
    Ok(Json(json!({"status": status})))
}

/// Body status for an ingestion result; store failures stay errors.
fn webhook_status(
    result: Result<IngestOutcome, IngestionError>,
) -> Result<&'static str, AppError> {
    match result {
        Ok(IngestOutcome::Activated { .. }) => Ok("success"),
        Ok(IngestOutcome::AlreadyProcessed) => Ok("already_processed"),
        Ok(IngestOutcome::Rejected(Rejection::UnresolvedAccount)) => Ok("invalid_steam_id"),
        Ok(IngestOutcome::Rejected(Rejection::UnsupportedProduct(_))) => Ok("failed"),
        Err(IngestionError::Db(e)) | Err(IngestionError::Ledger(LedgerError::Db(e))) => {
            Err(e.into())
        }
        Err(e) => {
            tracing::warn!(error = %e, "payment not applied");
            Ok("failed")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::AccountId;
    use crate::payments::UnsupportedProduct;

    #[test]
    fn test_webhook_status_mapping() {
        assert_eq!(
            webhook_status(Ok(IngestOutcome::Activated {
                account_id: AccountId::new(1),
                products: vec![],
            }))
            .unwrap(),
            "success"
        );
        assert_eq!(
            webhook_status(Ok(IngestOutcome::AlreadyProcessed)).unwrap(),
            "already_processed"
        );
        assert_eq!(
            webhook_status(Ok(IngestOutcome::Rejected(Rejection::UnresolvedAccount))).unwrap(),
            "invalid_steam_id"
        );
        assert_eq!(
            webhook_status(Ok(IngestOutcome::Rejected(Rejection::UnsupportedProduct(
                UnsupportedProduct {
                    product_id: "x".to_string(),
                    reason: "unknown product",
                }
            ))))
            .unwrap(),
            "failed"
        );
        assert!(webhook_status(Err(IngestionError::Db(sqlx::Error::PoolTimedOut))).is_err());
    }
}
