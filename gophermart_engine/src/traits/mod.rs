//! # Store and oracle contracts
//!
//! This module defines the behaviour that backends need to expose in order to drive the order settlement pipeline.
//!
//! * [`SettlementStore`] holds the atomic operations the poller and the registration gateway rely on: registering an
//!   order, moving its status forward, and crediting the owner's balance exactly once.
//! * [`AccountManagement`] covers users, balances, withdrawals and the read-only listings served to users.
//! * [`AccrualOracle`] is the external accrual system, as seen by the poller.
//!
//! The futures returned by the store traits are `Send`, so that implementations can be driven from spawned worker
//! tasks.
mod account_management;
mod accrual_oracle;
mod data_objects;
mod settlement_store;

pub use account_management::AccountManagement;
pub use accrual_oracle::AccrualOracle;
pub use data_objects::{InsertOrderResult, UpdateOrderResult};
pub(crate) use settlement_store::check_processed_update;
pub use settlement_store::{SettlementStore, StoreError};
