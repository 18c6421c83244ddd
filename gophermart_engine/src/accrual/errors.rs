use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AccrualError {
    #[error("The accrual system is rate limiting requests. Retry after {0:?}")]
    RateLimited(Option<Duration>),
    #[error("The accrual system returned an internal error (status {0})")]
    Internal(u16),
    #[error("The order is not known to the accrual system")]
    NotFound,
    #[error("The accrual system has no content for this order")]
    NoContent,
    #[error("Could not reach the accrual system. {0}")]
    Transport(String),
    #[error("The accrual system sent a response we could not understand. {0}")]
    InvalidResponse(String),
    #[error("Could not create the accrual client. {0}")]
    Initialization(String),
}

impl AccrualError {
    /// True for errors where asking again later may give a different answer.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::RateLimited(_) | Self::Internal(_) | Self::Transport(_) | Self::InvalidResponse(_))
    }
}

impl From<reqwest::Error> for AccrualError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            AccrualError::InvalidResponse(e.to_string())
        } else if e.is_builder() {
            AccrualError::Initialization(e.to_string())
        } else {
            AccrualError::Transport(e.to_string())
        }
    }
}
