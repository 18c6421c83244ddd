use std::future::Future;

use gm_common::Points;
use thiserror::Error;

use crate::{
    db_types::{Order, OrderNumber, OrderStatusType, StatusUpdate},
    traits::{InsertOrderResult, UpdateOrderResult},
};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("We have an internal database engine (configuration/uptime etc.) : {0}")]
    DatabaseError(String),
    #[error("The login {0} is already in use")]
    LoginAlreadyInUse(String),
    #[error("The requested user id {0} does not exist")]
    UserNotFound(i64),
    #[error("Insufficient funds. The balance is {balance}, but {requested} was requested")]
    InsufficientFunds { balance: Points, requested: Points },
    #[error("A withdrawal against order {0} already exists")]
    WithdrawalAlreadyExists(OrderNumber),
    #[error("{0} is not a valid amount for this operation")]
    InvalidAmount(Points),
    #[error("Illegal status update. {0}")]
    InvalidStatusUpdate(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::DatabaseError(e.to_string())
    }
}

/// The atomic operations behind order settlement.
///
/// Every method is a single unit of work: either all of its effects are persisted, or none are. Implementations use
/// the database transaction as the serialization point for an order or a user row, so callers need no further
/// locking.
pub trait SettlementStore: Clone + Send + Sync + 'static {
    /// Stores a new order with `NEW` status for `user_id`.
    ///
    /// If the order number is already known, nothing is written and the result tells the caller who owns it.
    /// Fails with [`StoreError::UserNotFound`] if the user does not exist.
    fn register_order(
        &self,
        user_id: i64,
        number: OrderNumber,
    ) -> impl Future<Output = Result<InsertOrderResult, StoreError>> + Send;

    /// Fetches every order that is not in a terminal status, oldest first. Used to seed the poll queue on start-up.
    fn fetch_unprocessed_orders(&self) -> impl Future<Output = Result<Vec<Order>, StoreError>> + Send;

    /// Moves the order forward to `update.status`, storing `update.accrual` with it. No balance is touched.
    ///
    /// The update only happens if the order belongs to `user_id` and its current status is a legal predecessor of
    /// the new one. Otherwise [`UpdateOrderResult::Unchanged`] is returned. Terminal statuses are therefore never
    /// revisited.
    fn change_status(
        &self,
        user_id: i64,
        update: StatusUpdate,
    ) -> impl Future<Output = Result<UpdateOrderResult, StoreError>> + Send;

    /// In a single atomic transaction, marks the order as `PROCESSED` with the given accrual **and** credits the
    /// accrual to the owner's balance.
    ///
    /// If the status guard does not allow the transition (the order has already been settled, for instance), the
    /// transaction is rolled back and [`UpdateOrderResult::Unchanged`] is returned, so a given accrual is credited
    /// at most once. The accrual must be positive.
    fn change_status_and_increment_balance(
        &self,
        user_id: i64,
        update: StatusUpdate,
    ) -> impl Future<Output = Result<UpdateOrderResult, StoreError>> + Send;

    /// Credits `amount` to the user's balance and returns the new balance. `amount` must be positive.
    fn increment_balance(&self, user_id: i64, amount: Points)
        -> impl Future<Output = Result<Points, StoreError>> + Send;
}

pub(crate) fn check_processed_update(update: &StatusUpdate) -> Result<(), StoreError> {
    if update.status != OrderStatusType::Processed {
        return Err(StoreError::InvalidStatusUpdate(format!(
            "Only {} orders can credit a balance, not {}",
            OrderStatusType::Processed,
            update.status
        )));
    }
    if !update.accrual.is_positive() {
        return Err(StoreError::InvalidAmount(update.accrual));
    }
    Ok(())
}
