//! Request handler definitions
//!
//! Define each route and its handler here. The handlers are deliberately thin: they pull the user and the payload out
//! of the request, call into the engine's public API, and turn the result into a response. Status-code mapping for
//! failures lives in [`crate::errors`].
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests. Every handler here awaits the database asynchronously. Order
//! registration also awaits space in the poll queue, which only takes as long as a poll worker needs to pick up its
//! next task.
use actix_web::{get, web, HttpResponse, Responder};
use gophermart_engine::{
    db_types::{NewWithdrawal, OrderNumber},
    traits::{AccountManagement, SettlementStore},
    AccountApi,
    RegistrationApi,
    RegistrationOutcome,
};
use log::*;

use crate::{
    data_objects::{JsonResponse, OrderResponse, WithdrawalRequest, WithdrawalResponse},
    errors::ServerError,
    helpers::AuthenticatedUser,
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $bound:ident) => {
        paste::paste! { pub struct [<$name:camel Route>]<B>(core::marker::PhantomData<fn() -> B>); }
        paste::paste! {
            impl<B> [<$name:camel Route>]<B> {
                #[allow(clippy::new_without_default)]
                pub fn new() -> Self {
                    Self(core::marker::PhantomData::<fn() -> B>)
                }
            }
        }
        paste::paste! {
            impl<B> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<B>
            where
                B: $bound + 'static,
            {
                fn register(self, config: &mut actix_web::dev::AppService) {
                    let res = actix_web::Resource::new($path)
                        .name(stringify!($name))
                        .guard(actix_web::guard::$method())
                        .to($name::<B>);
                    actix_web::dev::HttpServiceFactory::register(res, config);
                }
            }
        }
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Orders  ----------------------------------------------------
route!(register_order => Post "/orders" impl SettlementStore);
/// Route handler for order registration
///
/// The request body is the order number, as plain text. Responses:
/// * `202 Accepted` - the order is new, and has been queued for processing.
/// * `200 OK` - the caller registered this order before. Nothing changes.
/// * `409 Conflict` - another user owns this order number.
/// * `422 Unprocessable Entity` - the number fails the Luhn check.
/// * `400 Bad Request` - the body is not a number at all.
pub async fn register_order<B: SettlementStore>(
    user: AuthenticatedUser,
    body: String,
    api: web::Data<RegistrationApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let number = body.parse::<OrderNumber>().map_err(|e| {
        debug!("💻️ User #{} sent an unreadable order number. {e}", user.id());
        ServerError::InvalidRequestBody(e.to_string())
    })?;
    debug!("💻️ POST order {number} for user #{}", user.id());
    match api.register(user.id(), number).await? {
        RegistrationOutcome::Admitted(_) => {
            Ok(HttpResponse::Accepted().json(JsonResponse::success(format!("Order {number} accepted for processing"))))
        },
        RegistrationOutcome::AlreadyByOwner(_) => {
            Ok(HttpResponse::Ok().json(JsonResponse::success(format!("Order {number} was already registered"))))
        },
        RegistrationOutcome::AlreadyByOther => {
            Err(ServerError::Conflict(format!("Order {number} was registered by another user")))
        },
    }
}

route!(my_orders => Get "/orders" impl AccountManagement);
/// Route handler for the order listing. Oldest orders come first; an empty history is `204 No Content`.
pub async fn my_orders<B: AccountManagement>(
    user: AuthenticatedUser,
    api: web::Data<AccountApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET orders for user #{}", user.id());
    let orders = api.orders_for_user(user.id()).await?;
    if orders.is_empty() {
        return Ok(HttpResponse::NoContent().finish());
    }
    let orders = orders.into_iter().map(OrderResponse::from).collect::<Vec<_>>();
    Ok(HttpResponse::Ok().json(orders))
}

//----------------------------------------------   Balance  ----------------------------------------------------
route!(my_balance => Get "/balance" impl AccountManagement);
pub async fn my_balance<B: AccountManagement>(
    user: AuthenticatedUser,
    api: web::Data<AccountApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET balance for user #{}", user.id());
    let balance = api.balance(user.id()).await?;
    Ok(HttpResponse::Ok().json(balance))
}

route!(withdraw => Post "/balance/withdraw" impl AccountManagement);
/// Route handler for spending points
///
/// The body is `{"order": "<number>", "sum": <points>}`. Responses:
/// * `200 OK` - the points were withdrawn.
/// * `402 Payment Required` - the balance is too small. Nothing changes.
/// * `422 Unprocessable Entity` - the order number fails the Luhn check, or the sum is not positive.
/// * `409 Conflict` - a withdrawal against this order number already exists.
pub async fn withdraw<B: AccountManagement>(
    user: AuthenticatedUser,
    body: web::Json<WithdrawalRequest>,
    api: web::Data<AccountApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let req = body.into_inner();
    let order = req.order.parse::<OrderNumber>().map_err(|e| ServerError::InvalidOrderNumber(e.to_string()))?;
    debug!("💻️ POST withdrawal of {} against order {order} for user #{}", req.sum, user.id());
    let withdrawal = api.withdraw(user.id(), NewWithdrawal::new(order, req.sum)).await?;
    Ok(HttpResponse::Ok().json(WithdrawalResponse::from(withdrawal)))
}

route!(my_withdrawals => Get "/withdrawals" impl AccountManagement);
pub async fn my_withdrawals<B: AccountManagement>(
    user: AuthenticatedUser,
    api: web::Data<AccountApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET withdrawals for user #{}", user.id());
    let withdrawals = api.withdrawals_for_user(user.id()).await?;
    if withdrawals.is_empty() {
        return Ok(HttpResponse::NoContent().finish());
    }
    let withdrawals = withdrawals.into_iter().map(WithdrawalResponse::from).collect::<Vec<_>>();
    Ok(HttpResponse::Ok().json(withdrawals))
}
