//! # Order poller
//!
//! Registered orders are settled asynchronously. Every order that has not reached a terminal status is represented
//! by a [`PollTask`] in a bounded [`PollQueue`]. A fixed pool of workers drains the queue: each worker asks the
//! accrual system about one order, writes the outcome through the settlement store, and puts the task back in the
//! queue if the order is not settled yet.
//!
//! A task is never in the queue and in a worker at the same time, so two poll cycles for the same order never
//! overlap. The queue's bound applies to waiting tasks only: a worker frees a task's slot when it takes the task, and
//! a task that goes back competes for a slot like a new one. Every unsettled order keeps its turn, however many of
//! them there are.
//!
//! [`OrderPoller`] wires this together, and seeds the queue with every unprocessed order on start-up.
mod order_poller;
mod queue;
mod worker;

pub use order_poller::{OrderPoller, PollerConfig};
pub use queue::{poll_queue, PollQueue, PollTask, QueueClosed, TaskReceiver};
pub use worker::{poll_once, PollOutcome};
