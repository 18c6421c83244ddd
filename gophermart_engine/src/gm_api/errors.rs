use gm_common::Points;
use thiserror::Error;

use crate::{db_types::OrderNumber, traits::StoreError};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistrationError {
    #[error("Order number {0} is not valid")]
    InvalidOrderNumber(OrderNumber),
    #[error("The user #{0} does not exist")]
    UserNotFound(i64),
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<StoreError> for RegistrationError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::UserNotFound(id) => RegistrationError::UserNotFound(id),
            e => RegistrationError::DatabaseError(e.to_string()),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AccountApiError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Order number {0} is not valid")]
    InvalidOrderNumber(OrderNumber),
    #[error("{0} is not a valid amount")]
    InvalidAmount(Points),
    #[error("Insufficient funds. The balance is {balance}, but {requested} was requested")]
    InsufficientFunds { balance: Points, requested: Points },
    #[error("A withdrawal against order {0} already exists")]
    WithdrawalAlreadyExists(OrderNumber),
    #[error("The user #{0} does not exist")]
    UserNotFound(i64),
    #[error("The login {0} is already in use")]
    LoginAlreadyInUse(String),
    #[error("The login may not be empty")]
    EmptyLogin,
}

impl From<StoreError> for AccountApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::InsufficientFunds { balance, requested } => {
                AccountApiError::InsufficientFunds { balance, requested }
            },
            StoreError::WithdrawalAlreadyExists(n) => AccountApiError::WithdrawalAlreadyExists(n),
            StoreError::InvalidAmount(p) => AccountApiError::InvalidAmount(p),
            StoreError::UserNotFound(id) => AccountApiError::UserNotFound(id),
            StoreError::LoginAlreadyInUse(login) => AccountApiError::LoginAlreadyInUse(login),
            e => AccountApiError::DatabaseError(e.to_string()),
        }
    }
}
