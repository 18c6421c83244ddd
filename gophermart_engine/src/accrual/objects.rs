use std::fmt::Display;

use gm_common::Points;
use serde::{Deserialize, Serialize};

use crate::db_types::{OrderNumber, OrderStatusType};

/// The accrual system's view of an order. This vocabulary is distinct from [`OrderStatusType`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccrualStatus {
    /// The order is known, but nothing has been calculated yet.
    Registered,
    Processing,
    Invalid,
    Processed,
}

impl AccrualStatus {
    /// The local status an order moves to when the accrual system reports `self`. `Registered` carries no new
    /// information, so it has no counterpart.
    pub fn target_status(&self) -> Option<OrderStatusType> {
        match self {
            AccrualStatus::Registered => None,
            AccrualStatus::Processing => Some(OrderStatusType::Processing),
            AccrualStatus::Invalid => Some(OrderStatusType::Invalid),
            AccrualStatus::Processed => Some(OrderStatusType::Processed),
        }
    }
}

impl Display for AccrualStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AccrualStatus::Registered => write!(f, "REGISTERED"),
            AccrualStatus::Processing => write!(f, "PROCESSING"),
            AccrualStatus::Invalid => write!(f, "INVALID"),
            AccrualStatus::Processed => write!(f, "PROCESSED"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccrualQueryResult {
    pub order: OrderNumber,
    pub status: AccrualStatus,
    /// Only present for `PROCESSED` orders that earned something.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accrual: Option<Points>,
}

impl AccrualQueryResult {
    pub fn accrual_or_zero(&self) -> Points {
        self.accrual.unwrap_or_default()
    }
}
