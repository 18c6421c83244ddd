//! # Accrual system client
//!
//! The accrual system is the external oracle that decides whether an order earns points. It exposes a single
//! endpoint, `GET /api/orders/{number}`, which this module wraps in [`AccrualClient`].
//!
//! The client translates HTTP outcomes into an [`AccrualQueryResult`] or a typed [`AccrualError`]. It never retries
//! on its own; the poller decides what to do with each error.
mod client;
mod errors;
mod objects;

pub use client::{parse_retry_after, AccrualClient};
pub use errors::AccrualError;
pub use objects::{AccrualQueryResult, AccrualStatus};
