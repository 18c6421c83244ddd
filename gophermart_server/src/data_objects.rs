use std::fmt::Display;

use chrono::{DateTime, Utc};
use gm_common::Points;
use gophermart_engine::db_types::{Order, OrderNumber, OrderStatusType, Withdrawal};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }
}

/// An order as users see it. The accrual is only reported once the order has been processed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderResponse {
    pub number: OrderNumber,
    pub status: OrderStatusType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accrual: Option<Points>,
    pub uploaded_at: DateTime<Utc>,
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        let accrual = (order.status == OrderStatusType::Processed).then_some(order.accrual);
        Self { number: order.number, status: order.status, accrual, uploaded_at: order.uploaded_at }
    }
}

/// The body of a withdrawal request. The order number is kept as text so that malformed numbers can be told apart
/// from malformed JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawalRequest {
    pub order: String,
    pub sum: Points,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawalResponse {
    pub order: OrderNumber,
    pub sum: Points,
    pub processed_at: DateTime<Utc>,
}

impl From<Withdrawal> for WithdrawalResponse {
    fn from(w: Withdrawal) -> Self {
        Self { order: w.order_number, sum: w.sum, processed_at: w.processed_at }
    }
}
