use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{Order, OrderNumber},
    gm_api::errors::RegistrationError,
    poller::{PollQueue, PollTask},
    traits::{InsertOrderResult, SettlementStore},
};

/// The result of a successful call to [`RegistrationApi::register`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationOutcome {
    /// A brand-new order. It is now queued for polling.
    Admitted(Order),
    /// The caller registered this order number before. Registration is idempotent, so this is not an error.
    AlreadyByOwner(Order),
    /// Somebody else owns this order number.
    AlreadyByOther,
}

/// `RegistrationApi` is the entry point for new orders.
///
/// It validates the order number, stores the order, and hands admitted orders to the poller. The order is committed
/// before it is queued. When the queue is full, registration waits until a worker takes the next task.
pub struct RegistrationApi<B> {
    db: B,
    queue: PollQueue,
}

impl<B> Debug for RegistrationApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RegistrationApi")
    }
}

impl<B> RegistrationApi<B> {
    pub fn new(db: B, queue: PollQueue) -> Self {
        Self { db, queue }
    }
}

impl<B> RegistrationApi<B>
where B: SettlementStore
{
    /// Registers `number` for `user_id`.
    ///
    /// Numbers that fail the Luhn check are rejected before the database is touched. Only brand-new orders create a
    /// poll task; an order owned by another user is never polled on the caller's behalf.
    pub async fn register(&self, user_id: i64, number: OrderNumber) -> Result<RegistrationOutcome, RegistrationError> {
        if !number.is_valid() {
            debug!("🔄️ User #{user_id} submitted an invalid order number: {number}");
            return Err(RegistrationError::InvalidOrderNumber(number));
        }
        let outcome = match self.db.register_order(user_id, number).await? {
            InsertOrderResult::Inserted(order) => {
                self.enqueue(PollTask::from(&order)).await;
                RegistrationOutcome::Admitted(order)
            },
            InsertOrderResult::OwnedByUser(order) => RegistrationOutcome::AlreadyByOwner(order),
            InsertOrderResult::OwnedByAnotherUser => RegistrationOutcome::AlreadyByOther,
        };
        Ok(outcome)
    }

    async fn enqueue(&self, task: PollTask) {
        info!("🔄️ New {task} admitted for polling");
        let label = task.to_string();
        if let Err(e) = self.queue.push(task).await {
            warn!("🔄️ Could not queue {label}. {e}. It will be picked up again on restart");
        }
    }
}
