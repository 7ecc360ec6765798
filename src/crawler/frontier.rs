//! Work queue and completion barrier
//!
//! The frontier is a bounded queue of `CrawlTask`s plus an in-flight counter.
//! A task counts as in flight from the moment it is enqueued until the worker
//! that dequeued it calls [`Frontier::task_done`], which happens after the
//! task's children were enqueued. The counter reaching zero therefore means
//! no task is queued and none is being processed: the crawl is complete.

use crate::page::CrawlTask;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, Mutex, Notify};

/// Bounded task queue with in-flight accounting
#[derive(Debug)]
pub struct Frontier {
    sender: mpsc::Sender<CrawlTask>,
    receiver: Mutex<mpsc::Receiver<CrawlTask>>,
    in_flight: AtomicUsize,
    idle: Notify,
    dropped: AtomicUsize,
}

impl Frontier {
    /// Creates a frontier holding at most `capacity` queued tasks
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel(capacity.max(1));

        Self {
            sender,
            receiver: Mutex::new(receiver),
            in_flight: AtomicUsize::new(0),
            idle: Notify::new(),
            dropped: AtomicUsize::new(0),
        }
    }

    /// Enqueues a task without waiting
    ///
    /// A full queue drops the task; the drop is logged and counted.
    ///
    /// # Returns
    ///
    /// * `true` - The task was queued
    /// * `false` - The task was dropped
    pub fn try_enqueue(&self, task: CrawlTask) -> bool {
        // Counted before the send so a fast consumer can never observe zero early
        self.in_flight.fetch_add(1, Ordering::SeqCst);

        match self.sender.try_send(task) {
            Ok(()) => true,
            Err(TrySendError::Full(task)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                tracing::warn!("Work queue full, dropping {} (depth {})", task.url, task.depth);
                self.task_done();
                false
            }
            Err(TrySendError::Closed(task)) => {
                tracing::debug!("Work queue closed, discarding {}", task.url);
                self.task_done();
                false
            }
        }
    }

    /// Waits for the next task
    ///
    /// Workers contend for the receiver; dropping the returned future (for
    /// example when a cancellation branch of a `select!` wins) releases it.
    pub async fn dequeue(&self) -> Option<CrawlTask> {
        let mut receiver = self.receiver.lock().await;
        receiver.recv().await
    }

    /// Marks one dequeued (or dropped) task as fully processed
    pub fn task_done(&self) {
        if self.in_flight.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.idle.notify_one();
        }
    }

    /// Resolves once the in-flight count is zero
    ///
    /// Meant for a single waiter: `notify_one` stores a permit when nobody is
    /// waiting, so a transition to zero between the check and the await is
    /// not lost.
    pub async fn wait_idle(&self) {
        loop {
            if self.in_flight.load(Ordering::SeqCst) == 0 {
                return;
            }
            self.idle.notified().await;
        }
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Number of tasks dropped because the queue was full
    pub fn dropped(&self) -> usize {
        self.dropped.load(Ordering::Relaxed)
    }
}
