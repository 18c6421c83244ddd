use std::{fmt::Display, sync::Arc};

use log::{debug, trace};
use thiserror::Error;
use tokio::sync::{mpsc, watch, Mutex, OwnedSemaphorePermit, Semaphore};

use crate::db_types::{Order, OrderNumber, OrderStatusType};

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("The poll queue has been closed")]
pub struct QueueClosed;

//--------------------------------------       PollTask        ---------------------------------------------------------
/// A pending poll for a single order. Tasks only ever live in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollTask {
    pub number: OrderNumber,
    pub user_id: i64,
    /// The last status this task saw being written. Lets a worker skip writes that would not change anything.
    pub status: OrderStatusType,
    /// Ties together the log lines for one order as it moves through the pipeline.
    pub correlation_id: String,
    pub attempts: u32,
}

impl PollTask {
    pub fn new(number: OrderNumber, user_id: i64) -> Self {
        let correlation_id = format!("{:08x}", rand::random::<u32>());
        Self { number, user_id, status: OrderStatusType::New, correlation_id, attempts: 0 }
    }

    pub fn with_status(mut self, status: OrderStatusType) -> Self {
        self.status = status;
        self
    }
}

impl From<&Order> for PollTask {
    fn from(order: &Order) -> Self {
        PollTask::new(order.number, order.user_id).with_status(order.status)
    }
}

impl Display for PollTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "order {} (user #{}, cid {})", self.number, self.user_id, self.correlation_id)
    }
}

//--------------------------------------      QueuedTask       ---------------------------------------------------------
/// A task waiting in the queue, together with the slot it occupies. The slot is released as soon as a worker takes
/// the task.
#[derive(Debug)]
struct QueuedTask {
    task: PollTask,
    _slot: OwnedSemaphorePermit,
}

impl QueuedTask {
    fn release(self) -> PollTask {
        self.task
    }
}

//--------------------------------------       PollQueue       ---------------------------------------------------------
/// The producer side of the poll queue. Cloning is cheap; every clone feeds the same queue.
#[derive(Debug, Clone)]
pub struct PollQueue {
    sender: mpsc::UnboundedSender<QueuedTask>,
    slots: Arc<Semaphore>,
    capacity: usize,
    shutdown: Arc<watch::Sender<bool>>,
}

/// Creates a new poll queue that buffers at most `capacity` tasks. Tasks that a worker is busy with do not count.
pub fn poll_queue(capacity: usize) -> (PollQueue, TaskReceiver) {
    let capacity = capacity.max(1);
    let (sender, receiver) = mpsc::unbounded_channel();
    let (shutdown, shutdown_rx) = watch::channel(false);
    let queue = PollQueue { sender, slots: Arc::new(Semaphore::new(capacity)), capacity, shutdown: Arc::new(shutdown) };
    let receiver = TaskReceiver { receiver: Arc::new(Mutex::new(receiver)), shutdown: shutdown_rx };
    (queue, receiver)
}

impl PollQueue {
    /// Adds a task to the back of the queue. If the queue is full, this waits until a worker takes a task.
    ///
    /// Workers put unsettled orders back through here too, so new and requeued tasks share the same slots in arrival
    /// order.
    pub async fn push(&self, task: PollTask) -> Result<(), QueueClosed> {
        let slot = self.slots.clone().acquire_owned().await.map_err(|_| QueueClosed)?;
        if self.is_closed() {
            return Err(QueueClosed);
        }
        trace!("📮️ Queued {task}");
        self.sender.send(QueuedTask { task, _slot: slot }).map_err(|_| QueueClosed)
    }

    /// Stops accepting tasks. Producers waiting for a slot are released with [`QueueClosed`], and idle workers are
    /// woken so that they can drain what is left and exit.
    pub fn close(&self) {
        if !self.shutdown.send_replace(true) {
            debug!("📮️ Poll queue closed");
        }
        self.slots.close();
    }

    pub fn is_closed(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// The number of tasks waiting in the queue. Tasks being polled, or waiting out a retry delay, are not counted.
    pub fn pending(&self) -> usize {
        self.capacity.saturating_sub(self.slots.available_permits())
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// A handle that resolves once the queue is closed.
    pub fn subscribe_shutdown(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }
}

//--------------------------------------     TaskReceiver      ---------------------------------------------------------
/// The consumer side of the poll queue. Every worker holds a clone.
#[derive(Debug, Clone)]
pub struct TaskReceiver {
    receiver: Arc<Mutex<mpsc::UnboundedReceiver<QueuedTask>>>,
    shutdown: watch::Receiver<bool>,
}

impl TaskReceiver {
    /// Waits for the next task.
    ///
    /// Once the queue is closed this stops waiting, and only hands out tasks that were already buffered. `None`
    /// means the queue is closed and empty. The task's slot is freed before it is returned.
    pub async fn next(&mut self) -> Option<PollTask> {
        let mut receiver = tokio::select! {
            guard = self.receiver.lock() => guard,
            _ = self.shutdown.changed() => self.receiver.lock().await,
        };
        let queued = if *self.shutdown.borrow() {
            receiver.try_recv().ok()
        } else {
            tokio::select! {
                task = receiver.recv() => task,
                _ = self.shutdown.changed() => receiver.try_recv().ok(),
            }
        };
        queued.map(QueuedTask::release)
    }

    pub fn is_shutdown(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Sleeps for `delay`, returning early if the queue is closed in the meantime. Returns `true` if the full delay
    /// elapsed.
    pub async fn sleep(&mut self, delay: std::time::Duration) -> bool {
        if self.is_shutdown() {
            return false;
        }
        tokio::select! {
            _ = tokio::time::sleep(delay) => true,
            _ = self.shutdown.changed() => false,
        }
    }
}
