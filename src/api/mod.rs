pub mod admin;
pub mod health;
pub mod players;
pub mod ranking;
pub mod webhooks;

use crate::analytics::AnalyticsSink;
use crate::config::Config;
use crate::db::Repository;
use crate::domain::AccountId;
use crate::error::AppError;
use crate::orchestration::{
    Ingestor, MembershipLedger, PlayerLedger, PropertyGuard, RankingService,
};
use crate::payments::ProductCatalog;
use axum::http::HeaderMap;
use axum::{
    routing::{get, post, put},
    Router,
};
use sha2::{Digest, Sha256};
use std::str::FromStr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

pub const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub config: Config,
    pub players: PlayerLedger,
    pub memberships: MembershipLedger,
    pub properties: PropertyGuard,
    pub ranking: RankingService,
    pub ingestor: Ingestor,
}

impl AppState {
    pub fn new(
        repo: Arc<Repository>,
        config: Config,
        catalog: ProductCatalog,
        analytics: Arc<dyn AnalyticsSink>,
    ) -> Self {
        let players = PlayerLedger::new(repo.clone());
        let memberships = MembershipLedger::new(repo.clone(), players.clone(), config.ledger);
        let properties = PropertyGuard::new(repo.clone(), config.ledger);
        let ranking = RankingService::new(repo.clone(), config.ranking_denylist.clone());
        let ingestor = Ingestor::new(
            repo.clone(),
            Arc::new(catalog),
            players.clone(),
            memberships.clone(),
            analytics,
        );

        Self {
            repo,
            config,
            players,
            memberships,
            properties,
            ranking,
            ingestor,
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route("/v1/webhooks/afdian", post(webhooks::afdian_webhook))
        .route("/v1/webhooks/kofi", post(webhooks::kofi_webhook))
        .route(
            "/v1/admin/orders/afdian/reconcile",
            post(admin::reconcile_afdian),
        )
        .route("/v1/admin/orders/kofi/reconcile", post(admin::reconcile_kofi))
        .route("/v1/admin/players/:id/points", post(admin::adjust_points))
        .route("/v1/players/:id", get(players::get_player))
        .route("/v1/players/:id/matches", post(players::record_match))
        .route("/v1/players/:id/daily-login", post(players::daily_login))
        .route("/v1/players/:id/properties", put(players::upgrade_property))
        .route(
            "/v1/players/:id/properties/reset",
            post(players::reset_properties),
        )
        .route("/v1/ranking", get(ranking::get_ranking))
        .layer(cors)
        .with_state(state)
}

/// Compare secrets by digest so the comparison does not depend on where they differ.
pub(crate) fn tokens_match(given: &str, expected: &str) -> bool {
    Sha256::digest(given.as_bytes()) == Sha256::digest(expected.as_bytes())
}

pub(crate) fn require_admin(headers: &HeaderMap, config: &Config) -> Result<(), AppError> {
    let expected = config
        .admin_token
        .as_deref()
        .ok_or_else(|| AppError::Forbidden("admin API is disabled".to_string()))?;
    let given = headers
        .get(ADMIN_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::Unauthorized(format!("{} header required", ADMIN_TOKEN_HEADER)))?;

    if !tokens_match(given, expected) {
        return Err(AppError::Forbidden("invalid admin token".to_string()));
    }
    Ok(())
}

pub(crate) fn parse_account(raw: &str) -> Result<AccountId, AppError> {
    AccountId::from_str(raw).map_err(|e| AppError::BadRequest(e.to_string()))
}
