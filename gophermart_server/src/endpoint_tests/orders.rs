use std::time::Duration;

use actix_web::{http::StatusCode, test::TestRequest};
use gm_common::Points;
use gophermart_engine::{
    db_types::{OrderNumber, OrderStatusType, StatusUpdate},
    SettlementStore,
};
use serde_json::Value;

use super::helpers::{get, luhn_number, post_order, TestBackend};

#[actix_web::test]
async fn register_new_order() {
    let mut backend = TestBackend::new().await;
    let alice = backend.new_user("alice").await;

    let (status, body) = backend.call(post_order(alice, "12345678903")).await;
    assert_eq!(status, StatusCode::ACCEPTED, "{body}");
    let queued = tokio::time::timeout(Duration::from_secs(1), backend.tasks.next()).await.unwrap().unwrap();
    assert_eq!(queued.number, OrderNumber(12345678903));
    assert_eq!(queued.user_id, alice);

    let (status, _) = backend.call(post_order(alice, "12345678903\n")).await;
    assert_eq!(status, StatusCode::OK);
    let nothing = tokio::time::timeout(Duration::from_millis(100), backend.tasks.next()).await;
    assert!(nothing.is_err(), "A repeat registration must not create a poll task");
}

#[actix_web::test]
async fn order_owned_by_someone_else() {
    let backend = TestBackend::new().await;
    let alice = backend.new_user("alice").await;
    let bob = backend.new_user("bob").await;

    let (status, _) = backend.call(post_order(alice, "79927398713")).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    let (status, body) = backend.call(post_order(bob, "79927398713")).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body.contains("another user"), "{body}");
    let (status, _) = backend.call(get("/api/user/orders", bob)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[actix_web::test]
async fn malformed_registrations() {
    let backend = TestBackend::new().await;
    let alice = backend.new_user("alice").await;

    let (status, _) = backend.call(post_order(alice, "12345678901")).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let (status, _) = backend.call(post_order(alice, "12-34")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = backend.call(post_order(alice, "")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let req = TestRequest::post().uri("/api/user/orders").set_payload("12345678903");
    let (status, body) = backend.call(req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, r#"{"error":"No authenticated user was supplied with the request"}"#);
    // A user id the store has never heard of
    let (status, _) = backend.call(post_order(9999, "12345678903")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(backend.queue.pending(), 0);
}

#[actix_web::test]
async fn list_orders() {
    let backend = TestBackend::new().await;
    let alice = backend.new_user("alice").await;
    let (status, _) = backend.call(get("/api/user/orders", alice)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let first = luhn_number(1000);
    let second = luhn_number(2000);
    for n in [first, second] {
        let (status, _) = backend.call(post_order(alice, &n.to_string())).await;
        assert_eq!(status, StatusCode::ACCEPTED);
    }
    let update = StatusUpdate::new(first, OrderStatusType::Processed).with_accrual(Points::try_from(729.98).unwrap());
    assert!(backend.db.change_status_and_increment_balance(alice, update).await.unwrap().is_updated());
    let update = StatusUpdate::new(second, OrderStatusType::Processing);
    assert!(backend.db.change_status(alice, update).await.unwrap().is_updated());

    let (status, body) = backend.call(get("/api/user/orders", alice)).await;
    assert_eq!(status, StatusCode::OK);
    let orders: Value = serde_json::from_str(&body).unwrap();
    let orders = orders.as_array().unwrap();
    assert_eq!(orders.len(), 2);
    assert_eq!(orders[0]["number"], first.to_string());
    assert_eq!(orders[0]["status"], "PROCESSED");
    assert_eq!(orders[0]["accrual"].as_f64(), Some(729.98));
    assert!(orders[0]["uploaded_at"].is_string());
    assert_eq!(orders[1]["number"], second.to_string());
    assert_eq!(orders[1]["status"], "PROCESSING");
    assert!(orders[1].get("accrual").is_none());
}
