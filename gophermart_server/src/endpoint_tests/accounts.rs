use actix_web::{http::StatusCode, test::TestRequest};
use gm_common::Points;
use gophermart_engine::SettlementStore;
use serde_json::{json, Value};

use super::helpers::{as_user, get, TestBackend};

fn withdraw(user_id: i64, body: Value) -> TestRequest {
    as_user(TestRequest::post().uri("/api/user/balance/withdraw"), user_id).set_json(body)
}

async fn balance(backend: &TestBackend, user_id: i64) -> (f64, f64) {
    let (status, body) = backend.call(get("/api/user/balance", user_id)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let balance: Value = serde_json::from_str(&body).unwrap();
    (balance["current"].as_f64().unwrap(), balance["withdrawn"].as_f64().unwrap())
}

#[actix_web::test]
async fn fresh_balance() {
    let backend = TestBackend::new().await;
    let alice = backend.new_user("alice").await;
    assert_eq!(balance(&backend, alice).await, (0.0, 0.0));
    let (status, _) = backend.call(get("/api/user/withdrawals", alice)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = backend.call(TestRequest::get().uri("/api/user/balance")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn spend_points() {
    let backend = TestBackend::new().await;
    let alice = backend.new_user("alice").await;
    backend.db.increment_balance(alice, Points::from_points(100)).await.unwrap();

    let (status, body) = backend.call(withdraw(alice, json!({"order": "2377225624", "sum": 60}))).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let receipt: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(receipt["order"], "2377225624");
    assert_eq!(receipt["sum"].as_f64(), Some(60.0));
    assert_eq!(balance(&backend, alice).await, (40.0, 60.0));

    let (status, _) = backend.call(withdraw(alice, json!({"order": "49927398716", "sum": 50}))).await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    assert_eq!(balance(&backend, alice).await, (40.0, 60.0));

    let (status, _) = backend.call(withdraw(alice, json!({"order": "2377225624", "sum": 10}))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = backend.call(get("/api/user/withdrawals", alice)).await;
    assert_eq!(status, StatusCode::OK);
    let list: Value = serde_json::from_str(&body).unwrap();
    let list = list.as_array().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["order"], "2377225624");
    assert!(list[0]["processed_at"].is_string());
}

#[actix_web::test]
async fn rejected_withdrawals() {
    let backend = TestBackend::new().await;
    let alice = backend.new_user("alice").await;
    backend.db.increment_balance(alice, Points::from_points(100)).await.unwrap();

    let (status, _) = backend.call(withdraw(alice, json!({"order": "2377225625", "sum": 10}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let (status, _) = backend.call(withdraw(alice, json!({"order": "abc", "sum": 10}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let (status, _) = backend.call(withdraw(alice, json!({"order": "2377225624", "sum": 0}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let (status, _) = backend.call(withdraw(alice, json!({"order": "2377225624", "sum": -5}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let (status, _) = backend.call(withdraw(alice, json!({"order": "2377225624"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(balance(&backend, alice).await, (100.0, 0.0));
}
