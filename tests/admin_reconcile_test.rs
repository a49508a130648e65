mod common;

use axum::http::StatusCode;
use common::*;
use gameledger::domain::{OrderStatus, POINT_MAX};
use gameledger::Provider;
use serde_json::{json, Value};

const AFDIAN_RECONCILE: &str = "/v1/admin/orders/afdian/reconcile";
const KOFI_RECONCILE: &str = "/v1/admin/orders/kofi/reconcile";

fn afdian_order(tx: &str, user_id: &str, remark: &str) -> Value {
    json!({
        "ec": 200,
        "em": "",
        "data": {
            "type": "order",
            "order": {
                "out_trade_no": tx,
                "user_id": user_id,
                "plan_id": "plan-points",
                "month": 1,
                "total_amount": "30.00",
                "status": 2,
                "remark": remark,
                "sku_detail": []
            }
        }
    })
}

async fn deliver_afdian(t: &TestApp, payload: &Value) -> Value {
    let uri = format!("/v1/webhooks/afdian?token={}", AFDIAN_TOKEN);
    let (status, body) = send(&t.app, json_request("POST", &uri, payload)).await;
    assert_eq!(status, StatusCode::OK);
    body
}

async fn deliver_kofi(t: &TestApp, message_id: &str, message: &str) -> Value {
    let data = json!({
        "verification_token": KOFI_TOKEN,
        "message_id": message_id,
        "type": "Donation",
        "from_name": "Someone",
        "message": message,
        "amount": "2.00",
        "email": "Fan@Example.com",
        "currency": "USD"
    });
    let (status, body) = send(
        &t.app,
        form_request("/v1/webhooks/kofi", &[("data", &data.to_string())]),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body
}

#[tokio::test]
async fn test_admin_token_required() {
    let t = setup_test_app().await;
    let body = json!({"transactionId": "tx", "accountId": "1"});

    let (status, _) = send(&t.app, admin_request(AFDIAN_RECONCILE, &body, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&t.app, admin_request(AFDIAN_RECONCILE, &body, Some("guess"))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_afdian_reconcile_credits_once_and_links_contact() {
    let t = setup_test_app().await;
    let account = seed_player(&t.repo, 777, 0, 0).await;

    let body = deliver_afdian(&t, &afdian_order("tx-r1", "adf-fan", "forgot my id")).await;
    assert_eq!(body["message"], "invalid_steam_id");

    let request = json!({"transactionId": "tx-r1", "accountId": "777"});
    let (status, body) = send(
        &t.app,
        admin_request(AFDIAN_RECONCILE, &request, Some(ADMIN_TOKEN)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["accountId"], "777");
    assert_eq!(body["orders"][0]["transactionId"], "tx-r1");
    assert_eq!(body["orders"][0]["status"], "success");

    let (status, body) = send(
        &t.app,
        admin_request(AFDIAN_RECONCILE, &request, Some(ADMIN_TOKEN)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["orders"][0]["status"], "already_processed");

    let player = t.repo.get_player(&account).await.unwrap().unwrap();
    assert_eq!(player.member_point_total, 3500);

    // the same sponsor is now recognised without a reference
    let body = deliver_afdian(&t, &afdian_order("tx-r2", "adf-fan", "")).await;
    assert_eq!(body["message"], "success");
    let player = t.repo.get_player(&account).await.unwrap().unwrap();
    assert_eq!(player.member_point_total, 7000);
}

#[tokio::test]
async fn test_afdian_reconcile_unknown_order_or_player() {
    let t = setup_test_app().await;
    seed_player(&t.repo, 777, 0, 0).await;

    let request = json!({"transactionId": "missing", "accountId": "777"});
    let (status, _) = send(
        &t.app,
        admin_request(AFDIAN_RECONCILE, &request, Some(ADMIN_TOKEN)),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    deliver_afdian(&t, &afdian_order("tx-r3", "adf-x", "")).await;
    let request = json!({"transactionId": "tx-r3", "accountId": "999"});
    let (status, _) = send(
        &t.app,
        admin_request(AFDIAN_RECONCILE, &request, Some(ADMIN_TOKEN)),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let request = json!({"transactionId": "tx-r3", "accountId": "abc"});
    let (status, _) = send(
        &t.app,
        admin_request(AFDIAN_RECONCILE, &request, Some(ADMIN_TOKEN)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_kofi_reconcile_by_contact_key() {
    let t = setup_test_app().await;
    let account = seed_player(&t.repo, 31337, 0, 0).await;

    assert_eq!(deliver_kofi(&t, "k-1", "hi").await["status"], "invalid_steam_id");
    assert_eq!(deliver_kofi(&t, "k-2", "again").await["status"], "invalid_steam_id");

    let request = json!({"contactKey": "FAN@example.com", "accountId": "31337"});
    let (status, body) = send(
        &t.app,
        admin_request(KOFI_RECONCILE, &request, Some(ADMIN_TOKEN)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let orders = body["orders"].as_array().unwrap();
    assert_eq!(orders.len(), 2);
    assert!(orders.iter().all(|o| o["status"] == "success"));

    let player = t.repo.get_player(&account).await.unwrap().unwrap();
    assert_eq!(player.member_point_total, 400);

    for tx in ["k-1", "k-2"] {
        let order = t.repo.get_order(Provider::Kofi, tx).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Succeeded);
    }

    // nothing left to replay
    let (_, body) = send(
        &t.app,
        admin_request(KOFI_RECONCILE, &request, Some(ADMIN_TOKEN)),
    )
    .await;
    assert_eq!(body["orders"], json!([]));
}

#[tokio::test]
async fn test_kofi_reconcile_requires_target() {
    let t = setup_test_app().await;
    seed_player(&t.repo, 5, 0, 0).await;
    let request = json!({"accountId": "5"});
    let (status, _) = send(
        &t.app,
        admin_request(KOFI_RECONCILE, &request, Some(ADMIN_TOKEN)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_admin_point_adjustment() {
    let t = setup_test_app().await;
    seed_player(&t.repo, 12, 50, 10).await;
    let uri = "/v1/admin/players/12/points";

    let (status, body) = send(
        &t.app,
        admin_request(uri, &json!({"seasonPoint": 25, "memberPoint": -10}), Some(ADMIN_TOKEN)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["seasonPointTotal"], 75);
    assert_eq!(body["memberPointTotal"], 0);

    let (status, body) = send(
        &t.app,
        admin_request(uri, &json!({"memberPoint": -1}), Some(ADMIN_TOKEN)),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].is_string());

    let (status, _) = send(&t.app, admin_request(uri, &json!({"seasonPoint": 1}), None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_oversized_month_order_fails_and_stays_failed() {
    let t = setup_test_app().await;
    let account = seed_player(&t.repo, 31, 0, 0).await;
    let mut payload = afdian_order("tx-big", "adf-big", "31");
    payload["data"]["order"]["plan_id"] = json!("plan-premium");
    payload["data"]["order"]["month"] = json!(10_000_000);

    let body = deliver_afdian(&t, &payload).await;
    assert_eq!(body["message"], "failed");
    let order = t
        .repo
        .get_order(Provider::Afdian, "tx-big")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(order.status, OrderStatus::Failed);
    assert!(t.repo.get_membership(&account).await.unwrap().is_none());

    let request = json!({"transactionId": "tx-big", "accountId": "31"});
    let (status, _) = send(
        &t.app,
        admin_request(AFDIAN_RECONCILE, &request, Some(ADMIN_TOKEN)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_credit_past_balance_limit_fails_until_room_is_made() {
    let t = setup_test_app().await;
    let account = seed_player(&t.repo, 32, 0, POINT_MAX - 100).await;

    let body = deliver_afdian(&t, &afdian_order("tx-cap", "adf-cap", "32")).await;
    assert_eq!(body["message"], "failed");
    let order = t
        .repo
        .get_order(Provider::Afdian, "tx-cap")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(order.status, OrderStatus::Failed);

    let request = json!({"transactionId": "tx-cap", "accountId": "32"});
    let (status, body) = send(
        &t.app,
        admin_request(AFDIAN_RECONCILE, &request, Some(ADMIN_TOKEN)),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "balance limit exceeded");

    let (status, _) = send(
        &t.app,
        admin_request(
            "/v1/admin/players/32/points",
            &json!({"memberPoint": -10000}),
            Some(ADMIN_TOKEN),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &t.app,
        admin_request(AFDIAN_RECONCILE, &request, Some(ADMIN_TOKEN)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["orders"][0]["status"], "success");

    let player = t.repo.get_player(&account).await.unwrap().unwrap();
    assert_eq!(player.member_point_total, POINT_MAX - 100 - 10000 + 3500);
}

#[tokio::test]
async fn test_admin_adjustment_past_limit_conflicts() {
    let t = setup_test_app().await;
    let account = seed_player(&t.repo, 33, POINT_MAX - 5, 0).await;
    let uri = "/v1/admin/players/33/points";

    let (status, _) = send(
        &t.app,
        admin_request(uri, &json!({"seasonPoint": 10}), Some(ADMIN_TOKEN)),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(
        &t.app,
        admin_request(uri, &json!({"seasonPoint": i64::MAX}), Some(ADMIN_TOKEN)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let player = t.repo.get_player(&account).await.unwrap().unwrap();
    assert_eq!(player.season_point_total, POINT_MAX - 5);
}
