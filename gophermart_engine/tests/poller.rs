mod support;

use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use gm_common::Points;
use gophermart_engine::{
    accrual::{AccrualError, AccrualQueryResult, AccrualStatus},
    db_types::{OrderNumber, OrderStatusType},
    poller::{poll_once, PollOutcome, PollTask},
    AccountManagement,
    AccrualClient,
    AccrualOracle,
    OrderPoller,
    PollerConfig,
    RegistrationApi,
    SettlementStore,
    SqliteDatabase,
};
use serde_json::json;
use support::{new_user, test_database};
use wiremock::{
    matchers::{method, path},
    Mock,
    MockServer,
    ResponseTemplate,
};

type Reply = Result<AccrualQueryResult, AccrualError>;

/// An accrual system that answers from a script, one reply per query. The last reply for an order repeats forever.
#[derive(Clone, Default)]
struct ScriptedOracle {
    replies: Arc<Mutex<HashMap<OrderNumber, VecDeque<Reply>>>>,
    calls: Arc<Mutex<Vec<(OrderNumber, Instant)>>>,
    panics: Arc<Mutex<Vec<OrderNumber>>>,
}

impl ScriptedOracle {
    fn script(self, number: OrderNumber, replies: Vec<Reply>) -> Self {
        self.replies.lock().unwrap().insert(number, replies.into());
        self
    }

    fn panic_on(self, number: OrderNumber) -> Self {
        self.panics.lock().unwrap().push(number);
        self
    }

    fn calls_for(&self, number: OrderNumber) -> Vec<Instant> {
        self.calls.lock().unwrap().iter().filter(|(n, _)| *n == number).map(|(_, t)| *t).collect()
    }
}

impl AccrualOracle for ScriptedOracle {
    async fn query(&self, number: OrderNumber) -> Result<AccrualQueryResult, AccrualError> {
        self.calls.lock().unwrap().push((number, Instant::now()));
        if self.panics.lock().unwrap().contains(&number) {
            panic!("Scripted panic while querying {number}");
        }
        let mut replies = self.replies.lock().unwrap();
        let script = replies.get_mut(&number).ok_or(AccrualError::NotFound)?;
        match script.len() {
            0 => Err(AccrualError::NotFound),
            1 => script[0].clone(),
            _ => script.pop_front().unwrap_or(Err(AccrualError::NotFound)),
        }
    }
}

fn reply(number: OrderNumber, status: AccrualStatus, accrual: Option<i64>) -> Reply {
    Ok(AccrualQueryResult { order: number, status, accrual: accrual.map(Points::from) })
}

fn test_config(workers: usize) -> PollerConfig {
    PollerConfig::default()
        .with_workers(workers)
        .with_retry_interval(Duration::from_millis(10))
        .with_rate_limit_fallback(Duration::from_millis(200))
}

async fn wait_for_status(db: &SqliteDatabase, number: OrderNumber, status: OrderStatusType) {
    let deadline = Instant::now() + Duration::from_secs(10);
    loop {
        let order = db.fetch_order(number).await.unwrap().unwrap();
        if order.status == status {
            return;
        }
        assert!(Instant::now() < deadline, "Order {number} is still {} instead of {status}", order.status);
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

#[tokio::test]
async fn poll_once_interprets_oracle_statuses() {
    let db = test_database().await;
    let alice = new_user(&db, "alice").await;
    let (a, b, c, d) = (OrderNumber(18), OrderNumber(26), OrderNumber(34), OrderNumber(117));
    for n in [a, b, c, d] {
        db.register_order(alice, n).await.unwrap();
    }
    let oracle = ScriptedOracle::default()
        .script(a, vec![reply(a, AccrualStatus::Registered, None)])
        .script(b, vec![reply(b, AccrualStatus::Processing, None)])
        .script(c, vec![reply(c, AccrualStatus::Invalid, None)])
        .script(d, vec![reply(d, AccrualStatus::Processed, Some(500))]);
    let fallback = Duration::from_secs(1);

    let outcome = poll_once(&db, &oracle, &PollTask::new(a, alice), fallback).await;
    assert_eq!(outcome, PollOutcome::Requeue(OrderStatusType::New));
    assert_eq!(db.fetch_order(a).await.unwrap().unwrap().status, OrderStatusType::New);

    let outcome = poll_once(&db, &oracle, &PollTask::new(b, alice), fallback).await;
    assert_eq!(outcome, PollOutcome::Requeue(OrderStatusType::Processing));
    assert_eq!(db.fetch_order(b).await.unwrap().unwrap().status, OrderStatusType::Processing);

    let outcome = poll_once(&db, &oracle, &PollTask::new(c, alice), fallback).await;
    assert_eq!(outcome, PollOutcome::Settled(OrderStatusType::Invalid));
    assert_eq!(db.fetch_order(c).await.unwrap().unwrap().status, OrderStatusType::Invalid);

    let outcome = poll_once(&db, &oracle, &PollTask::new(d, alice), fallback).await;
    assert_eq!(outcome, PollOutcome::Settled(OrderStatusType::Processed));
    // Polling a settled order again must not credit it twice
    let outcome = poll_once(&db, &oracle, &PollTask::new(d, alice), fallback).await;
    assert_eq!(outcome, PollOutcome::Settled(OrderStatusType::Processed));
    assert_eq!(db.fetch_balance(alice).await.unwrap().current, Points::from(500));
}

#[tokio::test]
async fn poll_once_maps_oracle_errors() {
    let db = test_database().await;
    let alice = new_user(&db, "alice").await;
    let n = OrderNumber(18);
    db.register_order(alice, n).await.unwrap();
    let task = PollTask::new(n, alice);
    let fallback = Duration::from_secs(7);

    let cases = [
        (AccrualError::RateLimited(Some(Duration::from_secs(5))), PollOutcome::Backoff(Duration::from_secs(5))),
        (AccrualError::RateLimited(None), PollOutcome::Backoff(fallback)),
        (AccrualError::Internal(500), PollOutcome::Requeue(OrderStatusType::New)),
        (AccrualError::Transport("connection refused".into()), PollOutcome::Requeue(OrderStatusType::New)),
        (AccrualError::NotFound, PollOutcome::Dropped),
        (AccrualError::NoContent, PollOutcome::Dropped),
        (AccrualError::InvalidResponse("not json".into()), PollOutcome::Requeue(OrderStatusType::New)),
        (AccrualError::Initialization("bad url".into()), PollOutcome::Dropped),
    ];
    for (error, expected) in cases {
        let oracle = ScriptedOracle::default().script(n, vec![Err(error.clone())]);
        let outcome = poll_once(&db, &oracle, &task, fallback).await;
        assert_eq!(outcome, expected, "{error}");
    }
    assert_eq!(db.fetch_order(n).await.unwrap().unwrap().status, OrderStatusType::New);
}

#[tokio::test]
async fn processed_with_zero_accrual_credits_nothing() {
    let db = test_database().await;
    let alice = new_user(&db, "alice").await;
    let n = OrderNumber(26);
    db.register_order(alice, n).await.unwrap();
    let oracle = ScriptedOracle::default().script(n, vec![reply(n, AccrualStatus::Processed, Some(-300))]);
    let outcome = poll_once(&db, &oracle, &PollTask::new(n, alice), Duration::from_secs(1)).await;
    assert_eq!(outcome, PollOutcome::Settled(OrderStatusType::Processed));
    let order = db.fetch_order(n).await.unwrap().unwrap();
    assert!(order.accrual.is_zero());
    assert!(db.fetch_balance(alice).await.unwrap().current.is_zero());
}

#[tokio::test]
async fn rate_limited_order_waits_while_others_proceed() {
    let db = test_database().await;
    let alice = new_user(&db, "alice").await;
    let limited = OrderNumber(1115);
    let other = OrderNumber(2220);
    db.register_order(alice, limited).await.unwrap();
    db.register_order(alice, other).await.unwrap();
    let oracle = ScriptedOracle::default()
        .script(limited, vec![
            Err(AccrualError::RateLimited(Some(Duration::from_secs(1)))),
            reply(limited, AccrualStatus::Processed, Some(100)),
        ])
        .script(other, vec![
            reply(other, AccrualStatus::Processing, None),
            reply(other, AccrualStatus::Processing, None),
            reply(other, AccrualStatus::Processed, Some(250)),
        ]);

    let poller = OrderPoller::start(db.clone(), oracle.clone(), test_config(2));
    wait_for_status(&db, other, OrderStatusType::Processed).await;
    wait_for_status(&db, limited, OrderStatusType::Processed).await;
    poller.shutdown().await;

    let limited_calls = oracle.calls_for(limited);
    assert_eq!(limited_calls.len(), 2);
    assert!(limited_calls[1] - limited_calls[0] >= Duration::from_secs(1), "Order was polled again too soon");
    let other_calls = oracle.calls_for(other);
    assert_eq!(other_calls.len(), 3);
    assert!(other_calls[2] < limited_calls[1], "Other orders must be polled while the rate limit lasts");
    assert_eq!(db.fetch_balance(alice).await.unwrap().current, Points::from(350));
}

#[tokio::test]
async fn unknown_order_is_dropped_after_one_poll() {
    let db = test_database().await;
    let alice = new_user(&db, "alice").await;
    let unknown = OrderNumber(2220);
    let known = OrderNumber(1115);
    db.register_order(alice, unknown).await.unwrap();
    db.register_order(alice, known).await.unwrap();
    let oracle = ScriptedOracle::default()
        .script(unknown, vec![Err(AccrualError::NotFound)])
        .script(known, vec![reply(known, AccrualStatus::Invalid, None)]);

    let poller = OrderPoller::start(db.clone(), oracle.clone(), test_config(2));
    wait_for_status(&db, known, OrderStatusType::Invalid).await;
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(poller.queue().pending(), 0);
    poller.shutdown().await;

    assert_eq!(oracle.calls_for(unknown).len(), 1);
    assert_eq!(db.fetch_order(unknown).await.unwrap().unwrap().status, OrderStatusType::New);
}

#[tokio::test]
async fn settled_orders_are_not_polled_again() {
    let db = test_database().await;
    let alice = new_user(&db, "alice").await;
    let n = OrderNumber(34);
    db.register_order(alice, n).await.unwrap();
    let oracle = ScriptedOracle::default().script(n, vec![reply(n, AccrualStatus::Processed, Some(1000))]);

    let poller = OrderPoller::start(db.clone(), oracle.clone(), test_config(4));
    wait_for_status(&db, n, OrderStatusType::Processed).await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    poller.shutdown().await;

    assert_eq!(oracle.calls_for(n).len(), 1);
    assert_eq!(db.fetch_balance(alice).await.unwrap().current, Points::from(1000));
    // A restart finds nothing left to do
    let oracle = ScriptedOracle::default();
    let poller = OrderPoller::start(db.clone(), oracle.clone(), test_config(1));
    tokio::time::sleep(Duration::from_millis(100)).await;
    poller.shutdown().await;
    assert!(oracle.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn shutdown_stops_polling() {
    let db = test_database().await;
    let alice = new_user(&db, "alice").await;
    let n = OrderNumber(18);
    db.register_order(alice, n).await.unwrap();
    let oracle = ScriptedOracle::default().script(n, vec![reply(n, AccrualStatus::Registered, None)]);

    let poller = OrderPoller::start(db.clone(), oracle.clone(), test_config(2));
    tokio::time::sleep(Duration::from_millis(100)).await;
    tokio::time::timeout(Duration::from_secs(5), poller.shutdown()).await.expect("Shutdown took too long");
    let calls = oracle.calls_for(n).len();
    assert!(calls >= 1);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(oracle.calls_for(n).len(), calls);
    assert_eq!(db.fetch_order(n).await.unwrap().unwrap().status, OrderStatusType::New);
}

#[tokio::test]
async fn orders_that_never_settle_do_not_starve_new_ones() {
    let db = test_database().await;
    let alice = new_user(&db, "alice").await;
    let (stuck_a, stuck_b, fresh) = (OrderNumber(18), OrderNumber(26), OrderNumber(34));
    db.register_order(alice, stuck_a).await.unwrap();
    db.register_order(alice, stuck_b).await.unwrap();
    let oracle = ScriptedOracle::default()
        .script(stuck_a, vec![reply(stuck_a, AccrualStatus::Registered, None)])
        .script(stuck_b, vec![reply(stuck_b, AccrualStatus::Registered, None)])
        .script(fresh, vec![reply(fresh, AccrualStatus::Invalid, None)]);

    // One worker, and only room for the two orders that stay REGISTERED forever
    let poller = OrderPoller::start(db.clone(), oracle.clone(), test_config(1).with_queue_capacity(2));
    tokio::time::sleep(Duration::from_millis(100)).await;
    let api = RegistrationApi::new(db.clone(), poller.queue());
    tokio::time::timeout(Duration::from_secs(2), api.register(alice, fresh))
        .await
        .expect("Registration waited for the queue forever")
        .unwrap();
    wait_for_status(&db, fresh, OrderStatusType::Invalid).await;
    poller.shutdown().await;

    assert_eq!(oracle.calls_for(fresh).len(), 1);
    assert!(oracle.calls_for(stuck_a).len() > 1);
    assert!(oracle.calls_for(stuck_b).len() > 1);
    assert_eq!(db.fetch_order(stuck_a).await.unwrap().unwrap().status, OrderStatusType::New);
}

#[tokio::test]
async fn seeds_more_unsettled_orders_than_the_queue_holds() {
    let db = test_database().await;
    let alice = new_user(&db, "alice").await;
    let stuck = [OrderNumber(18), OrderNumber(26), OrderNumber(34), OrderNumber(42), OrderNumber(59)];
    let last = OrderNumber(67);
    let mut oracle = ScriptedOracle::default();
    for n in stuck {
        db.register_order(alice, n).await.unwrap();
        oracle = oracle.script(n, vec![reply(n, AccrualStatus::Processing, None)]);
    }
    db.register_order(alice, last).await.unwrap();
    let oracle = oracle.script(last, vec![reply(last, AccrualStatus::Processed, Some(40))]);

    let poller = OrderPoller::start(db.clone(), oracle.clone(), test_config(1).with_queue_capacity(2));
    wait_for_status(&db, last, OrderStatusType::Processed).await;
    for n in stuck {
        wait_for_status(&db, n, OrderStatusType::Processing).await;
    }
    poller.shutdown().await;
    assert_eq!(db.fetch_balance(alice).await.unwrap().current, Points::from(40));
}

#[tokio::test]
async fn worker_survives_a_panicking_poll() {
    let db = test_database().await;
    let alice = new_user(&db, "alice").await;
    let (doomed, fine) = (OrderNumber(18), OrderNumber(26));
    db.register_order(alice, doomed).await.unwrap();
    db.register_order(alice, fine).await.unwrap();
    let oracle = ScriptedOracle::default().panic_on(doomed).script(fine, vec![reply(fine, AccrualStatus::Invalid, None)]);

    let poller = OrderPoller::start(db.clone(), oracle.clone(), test_config(1));
    wait_for_status(&db, fine, OrderStatusType::Invalid).await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(poller.queue().pending(), 0);
    poller.shutdown().await;

    // The panicking task is dropped, not retried, and its order is left for the next restart
    assert_eq!(oracle.calls_for(doomed).len(), 1);
    assert_eq!(db.fetch_order(doomed).await.unwrap().unwrap().status, OrderStatusType::New);
}

#[tokio::test]
async fn settles_orders_against_http_accrual_system() {
    let server = MockServer::start().await;
    let db = test_database().await;
    let alice = new_user(&db, "alice").await;
    let (credited, invalid, slow) = (OrderNumber(12345678903), OrderNumber(79927398713), OrderNumber(9278923470));
    for n in [credited, invalid, slow] {
        db.register_order(alice, n).await.unwrap();
    }
    Mock::given(method("GET"))
        .and(path(format!("/api/orders/{credited}")))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"order": credited.to_string(), "status": "PROCESSED", "accrual": 729.98})),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/api/orders/{invalid}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"order": invalid.to_string(), "status": "INVALID"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/api/orders/{slow}")))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/api/orders/{slow}")))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/api/orders/{slow}")))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"order": slow.to_string(), "status": "PROCESSED", "accrual": 0.5})),
        )
        .mount(&server)
        .await;

    let client = AccrualClient::new(&server.uri(), Duration::from_secs(5)).unwrap();
    let poller = OrderPoller::start(db.clone(), client, test_config(3));
    wait_for_status(&db, credited, OrderStatusType::Processed).await;
    wait_for_status(&db, invalid, OrderStatusType::Invalid).await;
    wait_for_status(&db, slow, OrderStatusType::Processed).await;
    poller.shutdown().await;

    let balance = db.fetch_balance(alice).await.unwrap();
    assert_eq!(balance.current, Points::from(72998 + 50));
}
