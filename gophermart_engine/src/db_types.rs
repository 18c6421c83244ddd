use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use gm_common::{luhn, Points};
use log::error;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use sqlx::{FromRow, Type};
use thiserror::Error;

//--------------------------------------     OrderNumber     ---------------------------------------------------------
/// The number a user submits for an order. It is unique across all users.
///
/// On the wire (both the accrual system and the HTTP API) order numbers are strings of digits, but any JSON number is
/// accepted too.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Type)]
#[sqlx(transparent)]
pub struct OrderNumber(pub i64);

impl OrderNumber {
    pub fn value(&self) -> i64 {
        self.0
    }

    /// True if the number is positive and passes the Luhn checksum.
    pub fn is_valid(&self) -> bool {
        luhn::is_valid(self.0)
    }
}

impl From<i64> for OrderNumber {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl Display for OrderNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Invalid order number: {0}")]
pub struct OrderNumberParseError(String);

impl FromStr for OrderNumber {
    type Err = OrderNumberParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(OrderNumberParseError(s.to_string()));
        }
        s.parse::<i64>().map(Self).map_err(|e| OrderNumberParseError(format!("{s}. {e}")))
    }
}

impl Serialize for OrderNumber {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for OrderNumber {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(i64),
        }
        match Raw::deserialize(deserializer)? {
            Raw::Text(s) => s.parse().map_err(de::Error::custom),
            Raw::Number(n) => Ok(Self(n)),
        }
    }
}

//--------------------------------------   OrderStatusType     ---------------------------------------------------------
/// The settlement state of an order. Orders only ever move forward: `New -> Processing -> {Processed, Invalid}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatusType {
    /// The order has been registered, but the accrual system has not started on it yet.
    New,
    /// The accrual system is calculating the reward for the order.
    Processing,
    /// The accrual system refused to calculate a reward for the order. Terminal.
    Invalid,
    /// The reward has been calculated and credited to the user. Terminal.
    Processed,
}

impl OrderStatusType {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Invalid | Self::Processed)
    }

    /// The statuses an order may be in for a move to `self` to be legal.
    pub fn predecessors(&self) -> &'static [OrderStatusType] {
        use OrderStatusType::*;
        match self {
            New => &[],
            Processing => &[New],
            Invalid | Processed => &[New, Processing],
        }
    }

    pub fn can_transition_to(&self, next: OrderStatusType) -> bool {
        next.predecessors().contains(self)
    }
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatusType::New => write!(f, "NEW"),
            OrderStatusType::Processing => write!(f, "PROCESSING"),
            OrderStatusType::Invalid => write!(f, "INVALID"),
            OrderStatusType::Processed => write!(f, "PROCESSED"),
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("Invalid order status: {0}")]
pub struct ConversionError(String);

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NEW" => Ok(Self::New),
            "PROCESSING" => Ok(Self::Processing),
            "INVALID" => Ok(Self::Invalid),
            "PROCESSED" => Ok(Self::Processed),
            s => Err(ConversionError(s.to_string())),
        }
    }
}

impl From<String> for OrderStatusType {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid order status: {value}. But this conversion cannot fail. Defaulting to NEW");
            OrderStatusType::New
        })
    }
}

//--------------------------------------        Order          ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Order {
    pub number: OrderNumber,
    pub user_id: i64,
    pub status: OrderStatusType,
    /// Only meaningful once the order is `Processed`.
    pub accrual: Points,
    pub uploaded_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------     StatusUpdate      ---------------------------------------------------------
/// A status change for a single order, as decided by the poller from an accrual system response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusUpdate {
    pub number: OrderNumber,
    pub status: OrderStatusType,
    pub accrual: Points,
}

impl StatusUpdate {
    pub fn new(number: OrderNumber, status: OrderStatusType) -> Self {
        Self { number, status, accrual: Points::default() }
    }

    pub fn with_accrual(mut self, accrual: Points) -> Self {
        self.accrual = accrual;
        self
    }
}

//--------------------------------------     UserAccount       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct UserAccount {
    pub id: i64,
    pub login: String,
    /// Produced and checked by the authentication layer. The engine only stores it.
    pub password_hash: String,
    /// The spendable balance. Never negative.
    pub balance: Points,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------       Balance         ---------------------------------------------------------
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Balance {
    pub current: Points,
    /// Lifetime total of all withdrawals
    pub withdrawn: Points,
}

//--------------------------------------      Withdrawal       ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewWithdrawal {
    pub order: OrderNumber,
    pub sum: Points,
}

impl NewWithdrawal {
    pub fn new(order: OrderNumber, sum: Points) -> Self {
        Self { order, sum }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Withdrawal {
    pub id: i64,
    pub user_id: i64,
    pub order_number: OrderNumber,
    #[sqlx(rename = "amount")]
    pub sum: Points,
    pub processed_at: DateTime<Utc>,
}
