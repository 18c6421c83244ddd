use std::future::Future;

use crate::{
    accrual::{AccrualError, AccrualQueryResult},
    db_types::OrderNumber,
};

/// The external accrual system, which decides whether (and how much) an order earns.
///
/// A query is a single read. Implementations must not retry: the poller owns the retry and backoff policy.
pub trait AccrualOracle: Clone + Send + Sync + 'static {
    fn query(&self, number: OrderNumber) -> impl Future<Output = Result<AccrualQueryResult, AccrualError>> + Send;
}
