//! Unifies API for accessing user accounts.

use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{Balance, NewWithdrawal, Order, UserAccount, Withdrawal},
    gm_api::errors::AccountApiError,
    traits::AccountManagement,
};

/// The `AccountApi` provides a unified API for accessing user accounts and spending points.
pub struct AccountApi<B> {
    db: B,
}

impl<B: Debug> Debug for AccountApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AccountApi ({:?})", self.db)
    }
}

impl<B> AccountApi<B>
where B: AccountManagement
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    pub async fn create_user(&self, login: &str, password_hash: &str) -> Result<UserAccount, AccountApiError> {
        let login = login.trim();
        if login.is_empty() {
            return Err(AccountApiError::EmptyLogin);
        }
        let user = self.db.create_user(login, password_hash).await?;
        Ok(user)
    }

    /// Fetches the user for the given id. If no user exists, `None` is returned.
    pub async fn user_by_id(&self, user_id: i64) -> Result<Option<UserAccount>, AccountApiError> {
        let user = self.db.fetch_user(user_id).await?;
        Ok(user)
    }

    pub async fn user_by_login(&self, login: &str) -> Result<Option<UserAccount>, AccountApiError> {
        let user = self.db.fetch_user_by_login(login).await?;
        Ok(user)
    }

    pub async fn orders_for_user(&self, user_id: i64) -> Result<Vec<Order>, AccountApiError> {
        let orders = self.db.fetch_orders_for_user(user_id).await?;
        trace!("🔄️ User #{user_id} has {} orders", orders.len());
        Ok(orders)
    }

    pub async fn balance(&self, user_id: i64) -> Result<Balance, AccountApiError> {
        let balance = self.db.fetch_balance(user_id).await?;
        Ok(balance)
    }

    /// Spends `withdrawal.sum` points against the (future) order `withdrawal.order`.
    ///
    /// The order number must pass the Luhn check and the sum must be positive. A user can never spend more than
    /// their current balance; trying to do so fails with [`AccountApiError::InsufficientFunds`] and changes nothing.
    pub async fn withdraw(&self, user_id: i64, withdrawal: NewWithdrawal) -> Result<Withdrawal, AccountApiError> {
        if !withdrawal.order.is_valid() {
            return Err(AccountApiError::InvalidOrderNumber(withdrawal.order));
        }
        if !withdrawal.sum.is_positive() {
            return Err(AccountApiError::InvalidAmount(withdrawal.sum));
        }
        match self.db.withdraw(user_id, withdrawal).await {
            Ok(w) => {
                info!("🔄️ User #{user_id} withdrew {} against order {}", w.sum, w.order_number);
                Ok(w)
            },
            Err(e) => {
                debug!("🔄️ Withdrawal of {} by user #{user_id} was refused. {e}", withdrawal.sum);
                Err(e.into())
            },
        }
    }

    pub async fn withdrawals_for_user(&self, user_id: i64) -> Result<Vec<Withdrawal>, AccountApiError> {
        let withdrawals = self.db.fetch_withdrawals_for_user(user_id).await?;
        Ok(withdrawals)
    }
}
