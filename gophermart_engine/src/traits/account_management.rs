use std::future::Future;

use crate::{
    db_types::{Balance, NewWithdrawal, Order, OrderNumber, UserAccount, Withdrawal},
    traits::StoreError,
};

/// The `AccountManagement` trait defines behaviour for managing users and their points.
///
/// Credits only ever happen through [`crate::traits::SettlementStore`]. This trait covers the rest of the life of a
/// balance: reading it, and spending it through withdrawals.
pub trait AccountManagement: Clone + Send + Sync + 'static {
    /// Creates a new user with a zero balance. The password hash is stored as-is.
    fn create_user(
        &self,
        login: &str,
        password_hash: &str,
    ) -> impl Future<Output = Result<UserAccount, StoreError>> + Send;

    /// Fetches the user with the given id. If no such user exists, `None` is returned.
    fn fetch_user(&self, user_id: i64) -> impl Future<Output = Result<Option<UserAccount>, StoreError>> + Send;

    fn fetch_user_by_login(&self, login: &str)
        -> impl Future<Output = Result<Option<UserAccount>, StoreError>> + Send;

    fn fetch_order(&self, number: OrderNumber) -> impl Future<Output = Result<Option<Order>, StoreError>> + Send;

    /// All orders registered by the user, oldest first.
    fn fetch_orders_for_user(&self, user_id: i64) -> impl Future<Output = Result<Vec<Order>, StoreError>> + Send;

    /// The current balance and the lifetime withdrawn total for the user.
    fn fetch_balance(&self, user_id: i64) -> impl Future<Output = Result<Balance, StoreError>> + Send;

    /// In a single atomic transaction, checks that the user can afford the withdrawal, debits the balance and records
    /// the withdrawal.
    ///
    /// ## Failure modes
    /// * [`StoreError::InsufficientFunds`] if the balance is lower than the sum. Nothing is changed.
    /// * [`StoreError::WithdrawalAlreadyExists`] if the order number was already used for a withdrawal.
    /// * [`StoreError::InvalidAmount`] if the sum is not positive.
    /// * [`StoreError::UserNotFound`] if the user does not exist.
    fn withdraw(
        &self,
        user_id: i64,
        withdrawal: NewWithdrawal,
    ) -> impl Future<Output = Result<Withdrawal, StoreError>> + Send;

    /// All withdrawals made by the user, oldest first.
    fn fetch_withdrawals_for_user(
        &self,
        user_id: i64,
    ) -> impl Future<Output = Result<Vec<Withdrawal>, StoreError>> + Send;
}
