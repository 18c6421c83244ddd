//! The public API of the settlement engine.
//!
//! * [`registration_api::RegistrationApi`] admits new orders and hands them to the poller.
//! * [`account_api::AccountApi`] reads balances and order histories, and handles withdrawals.
//!
//! Both are generic over the storage backend, so that any backend implementing the [`crate::traits`] can be plugged
//! in.
pub mod account_api;
pub mod errors;
pub mod registration_api;
