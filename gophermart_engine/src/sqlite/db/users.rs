use gm_common::Points;
use log::{debug, trace};
use sqlx::SqliteConnection;

use crate::{
    db_types::{Balance, UserAccount},
    sqlite::db::is_unique_violation,
    traits::StoreError,
};

pub async fn insert_user(
    login: &str,
    password_hash: &str,
    conn: &mut SqliteConnection,
) -> Result<UserAccount, StoreError> {
    let user: UserAccount =
        sqlx::query_as("INSERT INTO users (login, password_hash) VALUES ($1, $2) RETURNING *")
            .bind(login)
            .bind(password_hash)
            .fetch_one(conn)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    StoreError::LoginAlreadyInUse(login.to_string())
                } else {
                    e.into()
                }
            })?;
    debug!("🗃️ Created user #{} ({login})", user.id);
    Ok(user)
}

pub async fn fetch_user(user_id: i64, conn: &mut SqliteConnection) -> Result<Option<UserAccount>, sqlx::Error> {
    let user = sqlx::query_as("SELECT * FROM users WHERE id = $1").bind(user_id).fetch_optional(conn).await?;
    Ok(user)
}

pub async fn fetch_user_by_login(login: &str, conn: &mut SqliteConnection) -> Result<Option<UserAccount>, sqlx::Error> {
    let user = sqlx::query_as("SELECT * FROM users WHERE login = $1").bind(login).fetch_optional(conn).await?;
    Ok(user)
}

/// Adds `amount` to the user's balance, returning the new balance.
pub(crate) async fn credit_balance(
    user_id: i64,
    amount: Points,
    conn: &mut SqliteConnection,
) -> Result<Points, StoreError> {
    if !amount.is_positive() {
        return Err(StoreError::InvalidAmount(amount));
    }
    let balance: Option<(Points,)> =
        sqlx::query_as("UPDATE users SET balance = balance + $1 WHERE id = $2 RETURNING balance")
            .bind(amount)
            .bind(user_id)
            .fetch_optional(conn)
            .await?;
    let (balance,) = balance.ok_or(StoreError::UserNotFound(user_id))?;
    trace!("🗃️ Credited {amount} to user #{user_id}. New balance: {balance}");
    Ok(balance)
}

/// Removes `amount` from the user's balance, but only if the balance covers it. The check and the debit are a single
/// statement, so two concurrent debits can never both pass against the same balance.
pub(crate) async fn debit_balance(
    user_id: i64,
    amount: Points,
    conn: &mut SqliteConnection,
) -> Result<Points, StoreError> {
    if !amount.is_positive() {
        return Err(StoreError::InvalidAmount(amount));
    }
    let balance: Option<(Points,)> =
        sqlx::query_as("UPDATE users SET balance = balance - $1 WHERE id = $2 AND balance >= $1 RETURNING balance")
            .bind(amount)
            .bind(user_id)
            .fetch_optional(&mut *conn)
            .await?;
    match balance {
        Some((balance,)) => {
            trace!("🗃️ Debited {amount} from user #{user_id}. New balance: {balance}");
            Ok(balance)
        },
        None => {
            let user = fetch_user(user_id, conn).await?.ok_or(StoreError::UserNotFound(user_id))?;
            Err(StoreError::InsufficientFunds { balance: user.balance, requested: amount })
        },
    }
}

pub async fn fetch_balance(user_id: i64, conn: &mut SqliteConnection) -> Result<Option<Balance>, sqlx::Error> {
    let balance = sqlx::query_as(
        r#"
        SELECT
            balance AS current,
            COALESCE((SELECT SUM(amount) FROM withdrawals WHERE withdrawals.user_id = users.id), 0) AS withdrawn
        FROM users
        WHERE id = $1
        "#,
    )
    .bind(user_id)
    .fetch_optional(conn)
    .await?;
    Ok(balance)
}
