use std::time::Duration;

use futures_util::future::join_all;
use log::*;
use tokio::task::JoinHandle;

use crate::{
    poller::{
        queue::poll_queue,
        worker::{run_worker, WorkerContext},
        PollQueue,
        PollTask,
    },
    traits::{AccrualOracle, SettlementStore},
};

pub const DEFAULT_WORKERS: usize = 8;
pub const DEFAULT_RATE_LIMIT_FALLBACK: Duration = Duration::from_secs(10);
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(1);

/// Worker pool configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollerConfig {
    /// Number of concurrent workers
    pub workers: usize,
    /// Maximum number of tasks waiting in the queue. Producers wait while it is full
    pub queue_capacity: usize,
    /// How long to back off when the accrual system rate limits us without saying for how long
    pub rate_limit_fallback: Duration,
    /// How long an unsettled order waits before it is polled again
    pub retry_interval: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            queue_capacity: 2 * DEFAULT_WORKERS,
            rate_limit_fallback: DEFAULT_RATE_LIMIT_FALLBACK,
            retry_interval: DEFAULT_RETRY_INTERVAL,
        }
    }
}

impl PollerConfig {
    /// Sets the worker count. The queue capacity follows at twice the worker count.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self.queue_capacity = 2 * self.workers;
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }

    pub fn with_rate_limit_fallback(mut self, delay: Duration) -> Self {
        self.rate_limit_fallback = delay;
        self
    }

    pub fn with_retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval = interval;
        self
    }
}

/// A running worker pool, along with the queue that feeds it.
pub struct OrderPoller {
    queue: PollQueue,
    workers: Vec<JoinHandle<()>>,
    seeder: JoinHandle<()>,
}

impl OrderPoller {
    /// Starts the workers, and seeds the queue with every order that has not been settled yet.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start<S, O>(store: S, oracle: O, config: PollerConfig) -> Self
    where
        S: SettlementStore,
        O: AccrualOracle,
    {
        let (queue, receiver) = poll_queue(config.queue_capacity);
        let ctx = WorkerContext {
            store: store.clone(),
            oracle,
            queue: queue.clone(),
            rate_limit_fallback: config.rate_limit_fallback,
            retry_interval: config.retry_interval,
        };
        let workers = (0..config.workers.max(1))
            .map(|id| tokio::spawn(run_worker(id, ctx.clone(), receiver.clone())))
            .collect::<Vec<_>>();
        info!(
            "📮️ Started {} poll workers with a queue capacity of {}",
            workers.len(),
            queue.capacity()
        );
        let seeder = tokio::spawn(seed_queue(store, queue.clone()));
        Self { queue, workers, seeder }
    }

    /// A handle for adding tasks to the queue.
    pub fn queue(&self) -> PollQueue {
        self.queue.clone()
    }

    /// Closes the queue, lets the workers drain what is left, and waits for them to exit.
    pub async fn shutdown(self) {
        info!("📮️ Shutting down the order poller");
        self.queue.close();
        if let Err(e) = self.seeder.await {
            warn!("📮️ The queue seeder did not exit cleanly. {e}");
        }
        for result in join_all(self.workers).await {
            if let Err(e) = result {
                warn!("📮️ A poll worker did not exit cleanly. {e}");
            }
        }
        info!("📮️ Order poller stopped");
    }
}

/// Puts every unsettled order in the queue, so that polling picks up where it left off after a restart.
async fn seed_queue<S: SettlementStore>(store: S, queue: PollQueue) {
    let orders = match store.fetch_unprocessed_orders().await {
        Ok(orders) => orders,
        Err(e) => {
            error!("📮️ Could not load unprocessed orders. They will not be polled until the next restart. {e}");
            return;
        },
    };
    let total = orders.len();
    info!("📮️ Seeding the poll queue with {total} unprocessed orders");
    for (i, order) in orders.iter().enumerate() {
        if queue.push(PollTask::from(order)).await.is_err() {
            warn!("📮️ The poll queue closed after seeding {i} of {total} orders");
            return;
        }
    }
    debug!("📮️ Seeding complete");
}
