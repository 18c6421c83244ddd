//! `SqliteDatabase` is a concrete implementation of an order settlement backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements all the traits defined in the [`crate::traits`]
//! module.
use std::fmt::Debug;

use gm_common::Points;
use log::*;
use sqlx::{migrate::MigrateError, SqlitePool};

use super::db::{new_pool, orders, users, withdrawals};
use crate::{
    db_types::{Balance, NewWithdrawal, Order, OrderNumber, StatusUpdate, UserAccount, Withdrawal},
    traits::{
        check_processed_update,
        AccountManagement,
        InsertOrderResult,
        SettlementStore,
        StoreError,
        UpdateOrderResult,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SettlementStore for SqliteDatabase {
    async fn register_order(&self, user_id: i64, number: OrderNumber) -> Result<InsertOrderResult, StoreError> {
        let mut conn = self.pool.acquire().await?;
        orders::idempotent_insert(user_id, number, &mut conn).await
    }

    async fn fetch_unprocessed_orders(&self) -> Result<Vec<Order>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let orders = orders::fetch_unprocessed_orders(&mut conn).await?;
        Ok(orders)
    }

    async fn change_status(&self, user_id: i64, update: StatusUpdate) -> Result<UpdateOrderResult, StoreError> {
        let mut conn = self.pool.acquire().await?;
        orders::update_order_status(user_id, update, &mut conn).await
    }

    async fn change_status_and_increment_balance(
        &self,
        user_id: i64,
        update: StatusUpdate,
    ) -> Result<UpdateOrderResult, StoreError> {
        check_processed_update(&update)?;
        let mut tx = self.pool.begin().await?;
        let result = orders::update_order_status(user_id, update, &mut tx).await?;
        if !result.is_updated() {
            debug!("🗃️ Order {} was already settled. No credit is applied", update.number);
            // Dropping the transaction rolls it back
            return Ok(result);
        }
        let balance = users::credit_balance(user_id, update.accrual, &mut tx).await?;
        tx.commit().await?;
        info!(
            "🗃️ Order {} settled. {} credited to user #{user_id}, whose balance is now {balance}",
            update.number, update.accrual
        );
        Ok(result)
    }

    async fn increment_balance(&self, user_id: i64, amount: Points) -> Result<Points, StoreError> {
        let mut conn = self.pool.acquire().await?;
        users::credit_balance(user_id, amount, &mut conn).await
    }
}

impl AccountManagement for SqliteDatabase {
    async fn create_user(&self, login: &str, password_hash: &str) -> Result<UserAccount, StoreError> {
        let mut conn = self.pool.acquire().await?;
        users::insert_user(login, password_hash, &mut conn).await
    }

    async fn fetch_user(&self, user_id: i64) -> Result<Option<UserAccount>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let user = users::fetch_user(user_id, &mut conn).await?;
        Ok(user)
    }

    async fn fetch_user_by_login(&self, login: &str) -> Result<Option<UserAccount>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let user = users::fetch_user_by_login(login, &mut conn).await?;
        Ok(user)
    }

    async fn fetch_order(&self, number: OrderNumber) -> Result<Option<Order>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order(number, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_orders_for_user(&self, user_id: i64) -> Result<Vec<Order>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let orders = orders::fetch_orders_for_user(user_id, &mut conn).await?;
        Ok(orders)
    }

    async fn fetch_balance(&self, user_id: i64) -> Result<Balance, StoreError> {
        let mut conn = self.pool.acquire().await?;
        users::fetch_balance(user_id, &mut conn).await?.ok_or(StoreError::UserNotFound(user_id))
    }

    async fn withdraw(&self, user_id: i64, withdrawal: NewWithdrawal) -> Result<Withdrawal, StoreError> {
        let mut tx = self.pool.begin().await?;
        let balance = users::debit_balance(user_id, withdrawal.sum, &mut tx).await?;
        let result = withdrawals::insert_withdrawal(user_id, withdrawal, &mut tx).await?;
        tx.commit().await?;
        info!("🗃️ User #{user_id} withdrew {} against order {}. Balance is now {balance}", result.sum, result.order_number);
        Ok(result)
    }

    async fn fetch_withdrawals_for_user(&self, user_id: i64) -> Result<Vec<Withdrawal>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let withdrawals = withdrawals::fetch_withdrawals_for_user(user_id, &mut conn).await?;
        Ok(withdrawals)
    }
}

impl SqliteDatabase {
    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("🗃️ Creating new database connection pool");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Brings the schema up to date using the embedded migrations.
    pub async fn run_migrations(&self) -> Result<(), MigrateError> {
        sqlx::migrate!("./src/sqlite/migrations").run(&self.pool).await?;
        info!("🗃️ Database migrations complete");
        Ok(())
    }

    /// Closes every connection in the pool. Outstanding queries are allowed to finish.
    pub async fn close(&self) {
        self.pool.close().await;
        info!("🗃️ Database pool closed");
    }
}
