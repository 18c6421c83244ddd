use crate::db_types::Order;

/// The result of trying to register an order number for a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOrderResult {
    /// The order was new, and has been stored with `NEW` status.
    Inserted(Order),
    /// The same user registered this order number before. Nothing was changed.
    OwnedByUser(Order),
    /// Another user owns this order number. Nothing was changed.
    OwnedByAnotherUser,
}

impl InsertOrderResult {
    pub fn is_inserted(&self) -> bool {
        matches!(self, Self::Inserted(_))
    }
}

/// The result of a guarded status update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOrderResult {
    /// The order moved forward. Contains the updated record.
    Updated(Order),
    /// The order does not exist for this user, or its current status does not allow the transition (e.g. it is
    /// already terminal). Nothing was changed.
    Unchanged,
}

impl UpdateOrderResult {
    pub fn is_updated(&self) -> bool {
        matches!(self, Self::Updated(_))
    }
}
