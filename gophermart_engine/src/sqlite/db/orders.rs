use log::{debug, trace};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use crate::{
    db_types::{Order, OrderNumber, OrderStatusType, StatusUpdate},
    sqlite::db::is_foreign_key_violation,
    traits::{InsertOrderResult, StoreError, UpdateOrderResult},
};

/// Inserts a new order with `NEW` status. If the order number already exists, nothing is written and the existing
/// owner decides the result.
///
/// This is not atomic by itself, but it only issues a single write.
pub async fn idempotent_insert(
    user_id: i64,
    number: OrderNumber,
    conn: &mut SqliteConnection,
) -> Result<InsertOrderResult, StoreError> {
    let inserted: Option<Order> = sqlx::query_as(
        r#"
            INSERT INTO orders (number, user_id, status)
            VALUES ($1, $2, $3)
            ON CONFLICT (number) DO NOTHING
            RETURNING *;
        "#,
    )
    .bind(number)
    .bind(user_id)
    .bind(OrderStatusType::New)
    .fetch_optional(&mut *conn)
    .await
    .map_err(|e| if is_foreign_key_violation(&e) { StoreError::UserNotFound(user_id) } else { e.into() })?;
    if let Some(order) = inserted {
        debug!("🗃️ Order {number} registered for user #{user_id}");
        return Ok(InsertOrderResult::Inserted(order));
    }
    let existing = fetch_order(number, conn)
        .await?
        .ok_or_else(|| StoreError::DatabaseError(format!("Order {number} conflicted on insert, but does not exist")))?;
    if existing.user_id == user_id {
        trace!("🗃️ Order {number} was already registered by user #{user_id}");
        Ok(InsertOrderResult::OwnedByUser(existing))
    } else {
        debug!("🗃️ User #{user_id} tried to register order {number}, which belongs to user #{}", existing.user_id);
        Ok(InsertOrderResult::OwnedByAnotherUser)
    }
}

pub async fn fetch_order(number: OrderNumber, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE number = $1").bind(number).fetch_optional(conn).await?;
    Ok(order)
}

pub async fn fetch_orders_for_user(user_id: i64, conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    let orders = sqlx::query_as("SELECT * FROM orders WHERE user_id = $1 ORDER BY uploaded_at ASC, id ASC")
        .bind(user_id)
        .fetch_all(conn)
        .await?;
    Ok(orders)
}

/// Fetches every order that has not reached a terminal status, oldest first.
pub async fn fetch_unprocessed_orders(conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    let orders = sqlx::query_as("SELECT * FROM orders WHERE status NOT IN ($1, $2) ORDER BY uploaded_at ASC, id ASC")
        .bind(OrderStatusType::Processed)
        .bind(OrderStatusType::Invalid)
        .fetch_all(conn)
        .await?;
    trace!("🗃️ {} unprocessed orders found", orders.len());
    Ok(orders)
}

/// Moves an order forward. The row is only touched if it belongs to `user_id` and its current status is one of the
/// legal predecessors of `update.status`.
pub(crate) async fn update_order_status(
    user_id: i64,
    update: StatusUpdate,
    conn: &mut SqliteConnection,
) -> Result<UpdateOrderResult, StoreError> {
    let predecessors = update.status.predecessors();
    if predecessors.is_empty() {
        return Err(StoreError::InvalidStatusUpdate(format!("No order can move to {}", update.status)));
    }
    let mut builder = QueryBuilder::<Sqlite>::new("UPDATE orders SET updated_at = CURRENT_TIMESTAMP, status = ");
    builder.push_bind(update.status);
    builder.push(", accrual = ");
    builder.push_bind(update.accrual);
    builder.push(" WHERE number = ");
    builder.push_bind(update.number);
    builder.push(" AND user_id = ");
    builder.push_bind(user_id);
    builder.push(" AND status IN (");
    let mut statuses = builder.separated(", ");
    for status in predecessors {
        statuses.push_bind(*status);
    }
    statuses.push_unseparated(") RETURNING *");
    trace!("🗃️ Executing query: {}", builder.sql());
    let order = builder.build_query_as::<Order>().fetch_optional(conn).await?;
    match order {
        Some(order) => {
            debug!("🗃️ Order {} for user #{user_id} is now {}", order.number, order.status);
            Ok(UpdateOrderResult::Updated(order))
        },
        None => {
            trace!("🗃️ Order {} for user #{user_id} was not moved to {}", update.number, update.status);
            Ok(UpdateOrderResult::Unchanged)
        },
    }
}
