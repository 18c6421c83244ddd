use std::{panic::AssertUnwindSafe, time::Duration};

use futures_util::FutureExt;
use gm_common::Points;
use log::*;

use crate::{
    accrual::{AccrualError, AccrualQueryResult},
    db_types::{OrderStatusType, StatusUpdate},
    poller::{PollQueue, PollTask, TaskReceiver},
    traits::{AccrualOracle, SettlementStore, UpdateOrderResult},
};

/// What should happen to a task after one poll cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// The order reached the given terminal status. The task is finished.
    Settled(OrderStatusType),
    /// The order is not settled yet, or something transient went wrong. Poll again later. Carries the latest known
    /// status.
    Requeue(OrderStatusType),
    /// The accrual system asked us to slow down. Wait this long before polling the order again.
    Backoff(Duration),
    /// The accrual system does not know the order, or cannot be asked about it at all. Stop polling it; the order keeps
    /// its current status.
    Dropped,
}

/// Runs a single poll cycle for `task`: ask the accrual system, write the outcome through the store, and decide
/// what to do with the task next.
///
/// Errors never escape this function; they are folded into the returned [`PollOutcome`].
pub async fn poll_once<S, O>(store: &S, oracle: &O, task: &PollTask, rate_limit_fallback: Duration) -> PollOutcome
where
    S: SettlementStore,
    O: AccrualOracle,
{
    match oracle.query(task.number).await {
        Ok(result) => settle(store, task, result).await,
        Err(AccrualError::RateLimited(delay)) => {
            let delay = delay.unwrap_or(rate_limit_fallback);
            debug!("📮️ Rate limited while polling {task}. Backing off for {delay:?}");
            PollOutcome::Backoff(delay)
        },
        Err(AccrualError::NotFound) | Err(AccrualError::NoContent) => {
            warn!("📮️ The accrual system does not know {task}. It will no longer be polled");
            PollOutcome::Dropped
        },
        Err(e) if e.is_transient() => {
            debug!("📮️ Could not poll {task}. {e}. Will try again");
            PollOutcome::Requeue(task.status)
        },
        Err(e) => {
            error!("📮️ Giving up on {task}. {e}");
            PollOutcome::Dropped
        },
    }
}

async fn settle<S: SettlementStore>(store: &S, task: &PollTask, result: AccrualQueryResult) -> PollOutcome {
    let user_id = task.user_id;
    trace!("📮️ Accrual system says {task} is {}", result.status);
    let Some(target) = result.status.target_status() else {
        return PollOutcome::Requeue(task.status);
    };
    // Terminal statuses are always written; the store ignores repeats
    if !target.is_terminal() && !task.status.can_transition_to(target) {
        return PollOutcome::Requeue(task.status);
    }
    let update = StatusUpdate::new(task.number, target);
    let written = match target {
        OrderStatusType::Processed => {
            let accrual = sanitize_accrual(task, result.accrual_or_zero());
            let update = update.with_accrual(accrual);
            if accrual.is_positive() {
                store.change_status_and_increment_balance(user_id, update).await
            } else {
                store.change_status(user_id, update).await
            }
        },
        _ => store.change_status(user_id, update).await,
    };
    match written {
        Ok(result) if target.is_terminal() => {
            log_settlement(task, &result, target);
            PollOutcome::Settled(target)
        },
        Ok(_) => PollOutcome::Requeue(target),
        Err(e) => {
            warn!("📮️ Could not mark {task} as {target}. {e}");
            PollOutcome::Requeue(task.status)
        },
    }
}

fn sanitize_accrual(task: &PollTask, accrual: Points) -> Points {
    if accrual < Points::default() {
        warn!("📮️ The accrual system reported a negative accrual ({accrual}) for {task}. Treating it as zero");
        Points::default()
    } else {
        accrual
    }
}

fn log_settlement(task: &PollTask, result: &UpdateOrderResult, status: OrderStatusType) {
    match result {
        UpdateOrderResult::Updated(order) => {
            info!("📮️ {task} settled as {status} with an accrual of {}", order.accrual);
        },
        UpdateOrderResult::Unchanged => {
            debug!("📮️ {task} was already settled. Nothing to do");
        },
    }
}

/// Everything a worker needs, cloned once per worker.
#[derive(Clone)]
pub(crate) struct WorkerContext<S, O> {
    pub store: S,
    pub oracle: O,
    pub queue: PollQueue,
    pub rate_limit_fallback: Duration,
    pub retry_interval: Duration,
}

/// Drains the queue until it is closed and empty.
pub(crate) async fn run_worker<S, O>(id: usize, ctx: WorkerContext<S, O>, mut tasks: TaskReceiver)
where
    S: SettlementStore,
    O: AccrualOracle,
{
    debug!("📮️ Worker {id} started");
    while let Some(mut task) = tasks.next().await {
        task.attempts += 1;
        let cycle = poll_once(&ctx.store, &ctx.oracle, &task, ctx.rate_limit_fallback);
        let outcome = match AssertUnwindSafe(cycle).catch_unwind().await {
            Ok(outcome) => outcome,
            Err(_) => {
                error!("📮️ Worker {id} panicked while polling {task}. The task has been dropped");
                continue;
            },
        };
        trace!("📮️ Worker {id}: attempt {} for {task} gave {outcome:?}", task.attempts);
        match outcome {
            PollOutcome::Settled(_) | PollOutcome::Dropped => {},
            PollOutcome::Requeue(status) => {
                task.status = status;
                requeue_later(&ctx.queue, task, ctx.retry_interval);
            },
            PollOutcome::Backoff(delay) => {
                if tasks.sleep(delay).await {
                    requeue_later(&ctx.queue, task, Duration::ZERO);
                } else {
                    debug!("📮️ Worker {id} is shutting down. {task} will be picked up again on restart");
                }
            },
        }
    }
    debug!("📮️ Worker {id} stopped");
}

/// Puts the task at the back of the queue after `delay`. The push waits for a free slot on its own task, never on the
/// worker.
fn requeue_later(queue: &PollQueue, task: PollTask, delay: Duration) {
    let queue = queue.clone();
    let mut shutdown = queue.subscribe_shutdown();
    tokio::spawn(async move {
        if !delay.is_zero() && !*shutdown.borrow() {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {},
                _ = shutdown.changed() => {},
            }
        }
        let label = task.to_string();
        if let Err(e) = queue.push(task).await {
            debug!("📮️ {e}. {label} will be picked up again on restart");
        }
    });
}
