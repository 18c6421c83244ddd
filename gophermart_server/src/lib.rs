//! # Gophermart server
//! This crate hosts the daemon for the Gophermart order settlement pipeline. It is responsible for:
//! * Opening the settlement store and keeping its schema up to date.
//! * Running the order poller, which settles registered orders against the accrual system.
//! * Serving a thin HTTP surface over the engine's public API.
//!
//! ## Configuration
//! The server is configured via environment variables, optionally overridden on the command line. See
//! [config](config/index.html) and [cli](cli/index.html) for more information.
//!
//! ## Routes
//! User authentication happens in front of this server. The id of the authenticated user arrives in the
//! `X-Gophermart-User` header. The server exposes the following routes:
//! * `GET /health`: A health check route that returns a 200 OK response.
//! * `POST /api/user/orders`: Register an order number for processing.
//! * `GET /api/user/orders`: The user's orders, oldest first.
//! * `GET /api/user/balance`: The user's current balance and lifetime withdrawals.
//! * `POST /api/user/balance/withdraw`: Spend points against an order number.
//! * `GET /api/user/withdrawals`: The user's withdrawals, oldest first.

pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;

pub mod helpers;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
