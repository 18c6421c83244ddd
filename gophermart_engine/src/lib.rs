//! Gophermart Settlement Engine
//!
//! Users register orders by number. An external accrual system decides, in its own time, whether each order earns
//! points, and earned points are credited to the owner's balance, which can later be spent through withdrawals.
//! This library contains the machinery that settles orders exactly once.
//!
//! The library is divided into these sections:
//! 1. Storage ([`mod@traits`] and [`mod@sqlite`]). The traits define the atomic operations the pipeline relies on;
//!    [`SqliteDatabase`] implements them. The data types shared by every backend live in [`mod@db_types`].
//! 2. The accrual system client ([`mod@accrual`]).
//! 3. The order poller ([`mod@poller`]): a bounded queue of pending orders, drained by a fixed pool of workers that
//!    poll the accrual system and write the results back through the store.
//! 4. The public API ([`RegistrationApi`] and [`AccountApi`]), which is what the HTTP layer talks to.
pub mod accrual;
pub mod db_types;
mod gm_api;
pub mod poller;
pub mod sqlite;
pub mod traits;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub use accrual::AccrualClient;
pub use gm_api::{
    account_api::AccountApi,
    errors::{AccountApiError, RegistrationError},
    registration_api::{RegistrationApi, RegistrationOutcome},
};
pub use poller::{OrderPoller, PollerConfig};
pub use sqlite::SqliteDatabase;
pub use traits::{AccountManagement, AccrualOracle, InsertOrderResult, SettlementStore, StoreError, UpdateOrderResult};
