use crate::orchestration::{IngestionError, LedgerError};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Internal server error: {0}")]
    Internal(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Conflict: {0}")]
    Conflict(String),
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::InsufficientBalance
            | LedgerError::BalanceLimitExceeded
            | LedgerError::BudgetExceeded { .. } => AppError::Conflict(err.to_string()),
            LedgerError::InvalidProperty(_) | LedgerError::Validation(_) => {
                AppError::BadRequest(err.to_string())
            }
            LedgerError::Db(e) => e.into(),
        }
    }
}

impl From<IngestionError> for AppError {
    fn from(err: IngestionError) -> Self {
        match err {
            IngestionError::OrderNotFound { .. } | IngestionError::UnresolvedAccount(_) => {
                AppError::NotFound(err.to_string())
            }
            IngestionError::UnsupportedProduct(_) | IngestionError::Payload(_) => {
                AppError::BadRequest(err.to_string())
            }
            IngestionError::OrderInProgress { .. } => AppError::Conflict(err.to_string()),
            IngestionError::Ledger(e) => e.into(),
            IngestionError::Db(e) => e.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ledger_errors_map_to_client_errors() {
        let status = |e: AppError| e.into_response().status();
        assert_eq!(
            status(LedgerError::InsufficientBalance.into()),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status(LedgerError::BalanceLimitExceeded.into()),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status(LedgerError::InvalidProperty("x".to_string()).into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status(
                IngestionError::OrderNotFound {
                    provider: crate::domain::Provider::Kofi,
                    transaction_id: "m".to_string(),
                }
                .into()
            ),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status(LedgerError::Db(sqlx::Error::PoolTimedOut).into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
