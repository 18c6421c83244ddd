use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use gophermart_engine::{AccountApiError, RegistrationError};
use log::error;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("No authenticated user was supplied with the request")]
    MissingUser,
    #[error("User #{0} is not known to this server")]
    UnknownUser(i64),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("Invalid order number. {0}")]
    InvalidOrderNumber(String),
    #[error("Invalid amount. {0}")]
    InvalidAmount(String),
    #[error("{0}")]
    InsufficientFunds(String),
    #[error("{0}")]
    Conflict(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::MissingUser => StatusCode::UNAUTHORIZED,
            Self::UnknownUser(_) => StatusCode::UNAUTHORIZED,
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::InvalidOrderNumber(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::InvalidAmount(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::InsufficientFunds(_) => StatusCode::PAYMENT_REQUIRED,
            Self::Conflict(_) => StatusCode::CONFLICT,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if self.status_code().is_server_error() {
            error!("💻️ {self}");
        }
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

impl From<RegistrationError> for ServerError {
    fn from(e: RegistrationError) -> Self {
        match e {
            RegistrationError::InvalidOrderNumber(n) => Self::InvalidOrderNumber(format!("{n} fails the Luhn check")),
            RegistrationError::UserNotFound(id) => Self::UnknownUser(id),
            RegistrationError::DatabaseError(s) => Self::BackendError(s),
        }
    }
}

impl From<AccountApiError> for ServerError {
    fn from(e: AccountApiError) -> Self {
        match e {
            AccountApiError::InvalidOrderNumber(n) => Self::InvalidOrderNumber(format!("{n} fails the Luhn check")),
            AccountApiError::InvalidAmount(_) => Self::InvalidAmount(e.to_string()),
            AccountApiError::InsufficientFunds { .. } => Self::InsufficientFunds(e.to_string()),
            AccountApiError::WithdrawalAlreadyExists(_) => Self::Conflict(e.to_string()),
            AccountApiError::LoginAlreadyInUse(_) => Self::Conflict(e.to_string()),
            AccountApiError::UserNotFound(id) => Self::UnknownUser(id),
            AccountApiError::EmptyLogin => Self::InvalidRequestBody(e.to_string()),
            AccountApiError::DatabaseError(s) => Self::BackendError(s),
        }
    }
}
