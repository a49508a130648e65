mod common;

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use common::*;
use gameledger::domain::OrderStatus;
use gameledger::{Provider, Tier};
use serde_json::{json, Value};

fn afdian_payload(tx: &str, plan: &str, remark: &str, status: i64) -> Value {
    json!({
        "ec": 200,
        "em": "",
        "data": {
            "type": "order",
            "order": {
                "out_trade_no": tx,
                "user_id": "adf-user-9",
                "plan_id": plan,
                "month": 1,
                "total_amount": "30.00",
                "show_amount": "30.00",
                "status": status,
                "remark": remark,
                "sku_detail": []
            }
        }
    })
}

fn webhook_uri(token: &str) -> String {
    format!("/v1/webhooks/afdian?token={}", token)
}

#[tokio::test]
async fn test_missing_and_wrong_token() {
    let t = setup_test_app().await;
    let payload = afdian_payload("tx-auth", "plan-premium", "1", 2);

    let (status, _) = send(
        &t.app,
        json_request("POST", "/v1/webhooks/afdian", &payload),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(&t.app, json_request("POST", &webhook_uri("nope"), &payload)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["error"].is_string());

    let order = t.repo.get_order(Provider::Afdian, "tx-auth").await.unwrap();
    assert!(order.is_none());
}

#[tokio::test]
async fn test_invalid_envelope() {
    let t = setup_test_app().await;
    let payload = json!({"ec": 500, "em": "oops"});

    let (status, body) = send(
        &t.app,
        json_request("POST", &webhook_uri(AFDIAN_TOKEN), &payload),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 400);
}

#[tokio::test]
async fn test_replay_mutates_once() {
    let t = setup_test_app().await;
    let account = seed_player(&t.repo, 136407523, 0, 0).await;
    let payload = afdian_payload("tx-1", "plan-premium", "136407523", 2);
    let today = Utc::now().date_naive();

    let (status, body) = send(
        &t.app,
        json_request("POST", &webhook_uri(AFDIAN_TOKEN), &payload),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["code"], 200);
    assert_eq!(body["message"], "success");

    let (status, body) = send(
        &t.app,
        json_request("POST", &webhook_uri(AFDIAN_TOKEN), &payload),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["code"], 200);
    assert_eq!(body["message"], "already_processed");

    let membership = t.repo.get_membership(&account).await.unwrap().unwrap();
    assert_eq!(membership.tier, Tier::Premium);
    assert_eq!(membership.expire_date, today + Duration::days(31));

    let order = t
        .repo
        .get_order(Provider::Afdian, "tx-1")
        .await
        .unwrap()
        .unwrap();
    assert!(order.success());
    assert_eq!(order.account_id, Some(account));
}

#[tokio::test]
async fn test_point_package_credits_member_points() {
    let t = setup_test_app().await;
    let account = seed_player(&t.repo, 55, 0, 0).await;
    let payload = afdian_payload("tx-pts", "plan-points", "55", 2);

    let (_, body) = send(
        &t.app,
        json_request("POST", &webhook_uri(AFDIAN_TOKEN), &payload),
    )
    .await;
    assert_eq!(body["message"], "success");

    let player = t.repo.get_player(&account).await.unwrap().unwrap();
    assert_eq!(player.member_point_total, 3500);
}

#[tokio::test]
async fn test_unsettled_order_is_not_persisted() {
    let t = setup_test_app().await;
    seed_player(&t.repo, 7, 0, 0).await;
    let payload = afdian_payload("tx-wait", "plan-premium", "7", 1);

    let (status, body) = send(
        &t.app,
        json_request("POST", &webhook_uri(AFDIAN_TOKEN), &payload),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "ignored");
    assert!(t
        .repo
        .get_order(Provider::Afdian, "tx-wait")
        .await
        .unwrap()
        .is_none());

    // the settled delivery still activates
    let settled = afdian_payload("tx-wait", "plan-premium", "7", 2);
    let (_, body) = send(
        &t.app,
        json_request("POST", &webhook_uri(AFDIAN_TOKEN), &settled),
    )
    .await;
    assert_eq!(body["message"], "success");
}

#[tokio::test]
async fn test_unresolved_account_is_recorded_as_failed() {
    let t = setup_test_app().await;
    let payload = afdian_payload("tx-lost", "plan-premium", "not an id", 2);

    let (status, body) = send(
        &t.app,
        json_request("POST", &webhook_uri(AFDIAN_TOKEN), &payload),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["code"], 200);
    assert_eq!(body["message"], "invalid_steam_id");

    let order = t
        .repo
        .get_order(Provider::Afdian, "tx-lost")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(order.status, OrderStatus::Failed);
    assert!(order.account_id.is_none());
    assert_eq!(order.contact_key.as_deref(), Some("adf-user-9"));
}
