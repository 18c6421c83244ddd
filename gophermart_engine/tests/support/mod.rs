#![allow(dead_code)]
use gm_common::luhn;
pub use gophermart_engine::test_utils::test_database;
use gophermart_engine::{db_types::OrderNumber, AccountManagement, SqliteDatabase};

pub async fn new_user(db: &SqliteDatabase, login: &str) -> i64 {
    db.create_user(login, "not-a-real-hash").await.expect("Error creating user").id
}

/// Appends a Luhn check digit to `base`.
pub fn luhn_number(base: i64) -> OrderNumber {
    let number = (0..10).map(|d| base * 10 + d).find(|n| luhn::is_valid(*n)).expect("One check digit always fits");
    OrderNumber(number)
}
