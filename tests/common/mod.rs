#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use gameledger::api::{self, AppState};
use gameledger::config::{Config, LedgerConfig};
use gameledger::db::init_db;
use gameledger::{AccountId, AnalyticsSink, MockAnalytics, ProductCatalog, Repository};
use serde_json::Value;
use std::sync::Arc;
use tempfile::TempDir;
use tower::util::ServiceExt;

pub const AFDIAN_TOKEN: &str = "afdian-secret";
pub const KOFI_TOKEN: &str = "kofi-secret";
pub const ADMIN_TOKEN: &str = "admin-secret";

const CATALOG: &str = r#"{
    "products": [
        {"provider": "afdian", "productId": "plan-normal", "kind": "membership", "tier": "normal"},
        {"provider": "afdian", "productId": "plan-premium", "kind": "membership", "tier": "premium"},
        {"provider": "afdian", "productId": "plan-points", "kind": "point_package", "points": 3500},
        {"provider": "kofi", "productId": "donation", "kind": "point_package", "points": 100},
        {"provider": "kofi", "productId": "Premium Member", "kind": "membership", "tier": "premium"},
        {"provider": "kofi", "productId": "reset-token", "kind": "one_time_reset"}
    ]
}"#;

pub struct TestApp {
    pub app: Router,
    pub repo: Arc<Repository>,
    pub analytics: Arc<MockAnalytics>,
    _temp: TempDir,
}

pub async fn setup_test_app() -> TestApp {
    setup_test_app_with_denylist(vec![]).await
}

pub async fn setup_test_app_with_denylist(ranking_denylist: Vec<AccountId>) -> TestApp {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir
        .path()
        .join("test.db")
        .to_string_lossy()
        .to_string();

    let pool = init_db(&db_path).await.expect("init_db failed");
    let repo = Arc::new(Repository::new(pool));

    let config = Config {
        port: 0,
        database_path: db_path,
        afdian_webhook_token: AFDIAN_TOKEN.to_string(),
        kofi_verification_token: KOFI_TOKEN.to_string(),
        admin_token: Some(ADMIN_TOKEN.to_string()),
        product_catalog_path: None,
        analytics_url: None,
        ranking_denylist,
        ledger: LedgerConfig::default(),
    };

    let analytics = Arc::new(MockAnalytics::new());
    let sink: Arc<dyn AnalyticsSink> = analytics.clone();
    let catalog = ProductCatalog::from_json(CATALOG).unwrap();
    let state = AppState::new(repo.clone(), config, catalog, sink);

    TestApp {
        app: api::create_router(state),
        repo,
        analytics,
        _temp: temp_dir,
    }
}

/// Send a request and decode the JSON body (`Null` when the body is not JSON).
pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub fn json_request(method: &str, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn admin_request(uri: &str, body: &Value, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("x-admin-token", token);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn form_request(uri: &str, fields: &[(&str, &str)]) -> Request<Body> {
    let body = serde_urlencoded::to_string(fields).unwrap();
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/x-www-form-urlencoded")
        .body(Body::from(body))
        .unwrap()
}

pub async fn seed_player(repo: &Repository, id: u64, season: i64, member: i64) -> AccountId {
    let account = AccountId::new(id);
    repo.apply_point_delta(&account, gameledger::domain::PointDelta { season, member })
        .await
        .unwrap();
    account
}
