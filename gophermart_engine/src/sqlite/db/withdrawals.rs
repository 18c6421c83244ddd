use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{NewWithdrawal, Withdrawal},
    sqlite::db::{is_foreign_key_violation, is_unique_violation},
    traits::StoreError,
};

/// Records a withdrawal. The caller is responsible for debiting the balance in the same transaction.
pub(crate) async fn insert_withdrawal(
    user_id: i64,
    withdrawal: NewWithdrawal,
    conn: &mut SqliteConnection,
) -> Result<Withdrawal, StoreError> {
    let NewWithdrawal { order, sum } = withdrawal;
    let result: Withdrawal =
        sqlx::query_as("INSERT INTO withdrawals (user_id, order_number, amount) VALUES ($1, $2, $3) RETURNING *")
            .bind(user_id)
            .bind(order)
            .bind(sum)
            .fetch_one(conn)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    StoreError::WithdrawalAlreadyExists(order)
                } else if is_foreign_key_violation(&e) {
                    StoreError::UserNotFound(user_id)
                } else {
                    e.into()
                }
            })?;
    debug!("🗃️ User #{user_id} withdrew {sum} against order {order}");
    Ok(result)
}

pub async fn fetch_withdrawals_for_user(
    user_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<Withdrawal>, sqlx::Error> {
    let withdrawals = sqlx::query_as("SELECT * FROM withdrawals WHERE user_id = $1 ORDER BY processed_at ASC, id ASC")
        .bind(user_id)
        .fetch_all(conn)
        .await?;
    Ok(withdrawals)
}
