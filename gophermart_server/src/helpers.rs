use std::future::{ready, Ready};

use actix_web::{dev::Payload, FromRequest, HttpRequest};
use log::{debug, trace};

use crate::errors::ServerError;

/// The header in which the authentication layer in front of this server passes the id of the logged-in user.
pub const USER_HEADER: &str = "X-Gophermart-User";

/// The user on whose behalf a request is made, as vouched for by the authentication layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUser(pub i64);

impl AuthenticatedUser {
    pub fn id(&self) -> i64 {
        self.0
    }
}

impl FromRequest for AuthenticatedUser {
    type Error = ServerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(get_user_id(req).map(AuthenticatedUser))
    }
}

/// Reads the user id from the [`USER_HEADER`] header. Missing, non-numeric and non-positive ids are all rejected.
pub fn get_user_id(req: &HttpRequest) -> Result<i64, ServerError> {
    let value = req.headers().get(USER_HEADER).ok_or_else(|| {
        trace!("💻️ Request to {} carries no {USER_HEADER} header", req.path());
        ServerError::MissingUser
    })?;
    value.to_str().ok().and_then(|s| s.trim().parse::<i64>().ok()).filter(|id| *id > 0).ok_or_else(|| {
        debug!("💻️ Request to {} carries a malformed {USER_HEADER} header: {value:?}", req.path());
        ServerError::MissingUser
    })
}
