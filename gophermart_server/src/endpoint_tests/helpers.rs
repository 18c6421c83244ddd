use actix_web::{http::StatusCode, test, test::TestRequest, web, App};
use gm_common::luhn;
use gophermart_engine::{
    db_types::OrderNumber,
    poller::{poll_queue, PollQueue, TaskReceiver},
    test_utils::test_database,
    AccountApi,
    AccountManagement,
    RegistrationApi,
    SqliteDatabase,
};
use log::debug;

use crate::{helpers::USER_HEADER, server::configure_routes};

/// A migrated database and a poll queue with no workers behind it, so tests can see what gets queued.
pub struct TestBackend {
    pub db: SqliteDatabase,
    pub queue: PollQueue,
    pub tasks: TaskReceiver,
}

impl TestBackend {
    pub async fn new() -> Self {
        let db = test_database().await;
        let (queue, tasks) = poll_queue(16);
        Self { db, queue, tasks }
    }

    pub async fn new_user(&self, login: &str) -> i64 {
        self.db.create_user(login, "not-a-real-hash").await.expect("Error creating user").id
    }

    /// Sends `req` through the full route table and returns the status and body.
    pub async fn call(&self, req: TestRequest) -> (StatusCode, String) {
        let app = App::new()
            .app_data(web::Data::new(RegistrationApi::new(self.db.clone(), self.queue.clone())))
            .app_data(web::Data::new(AccountApi::new(self.db.clone())))
            .configure(configure_routes);
        let service = test::init_service(app).await;
        debug!("Making request");
        let res = test::call_service(&service, req.to_request()).await;
        let status = res.status();
        let body = test::read_body(res).await;
        (status, String::from_utf8_lossy(&body).into_owned())
    }
}

pub fn as_user(req: TestRequest, user_id: i64) -> TestRequest {
    req.insert_header((USER_HEADER, user_id.to_string()))
}

pub fn post_order(user_id: i64, body: &str) -> TestRequest {
    as_user(TestRequest::post().uri("/api/user/orders"), user_id)
        .insert_header(("Content-Type", "text/plain"))
        .set_payload(body.to_string())
}

pub fn get(path: &str, user_id: i64) -> TestRequest {
    as_user(TestRequest::get().uri(path), user_id)
}

/// Appends a Luhn check digit to `base`.
pub fn luhn_number(base: i64) -> OrderNumber {
    let number = (0..10).map(|d| base * 10 + d).find(|n| luhn::is_valid(*n)).expect("One check digit always fits");
    OrderNumber(number)
}
