//! In-process job queues.
//!
//! A queue is an unbounded mpsc channel. Producers hold a [`JobQueue`];
//! the single consumer holds the matching [`JobReceiver`], which can also
//! put a failed job back for another attempt. The receiver only keeps a
//! weak sender, so the channel closes once every producer is dropped.

use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender, WeakUnboundedSender};
use tracing::{debug, warn};

/// A job together with its delivery attempt number, starting at 1.
#[derive(Debug)]
pub struct Delivery<T> {
    pub job: T,
    pub attempt: u32,
}

/// Producer side of a job queue.
#[derive(Debug)]
pub struct JobQueue<T> {
    name: &'static str,
    tx: UnboundedSender<Delivery<T>>,
}

impl<T> Clone for JobQueue<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            tx: self.tx.clone(),
        }
    }
}

impl<T> JobQueue<T> {
    /// Queue name used in logs.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Enqueue a job for its first attempt.
    ///
    /// Never blocks. Returns false, and logs, if the consumer has gone away.
    pub fn enqueue(&self, job: T) -> bool {
        match self.tx.send(Delivery { job, attempt: 1 }) {
            Ok(()) => {
                debug!(queue = self.name, "Job enqueued");
                true
            }
            Err(_) => {
                warn!(queue = self.name, "Job dropped: queue is closed");
                false
            }
        }
    }
}

/// Consumer side of a job queue.
#[derive(Debug)]
pub struct JobReceiver<T> {
    name: &'static str,
    rx: UnboundedReceiver<Delivery<T>>,
    retry: WeakUnboundedSender<Delivery<T>>,
}

impl<T> JobReceiver<T> {
    /// Queue name used in logs.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Wait for the next delivery. None once all producers are gone and the
    /// queue is drained.
    pub async fn recv(&mut self) -> Option<Delivery<T>> {
        self.rx.recv().await
    }

    /// Take a delivery without waiting.
    pub fn try_recv(&mut self) -> Option<Delivery<T>> {
        match self.rx.try_recv() {
            Ok(delivery) => Some(delivery),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    /// Put a job back on the queue for its next attempt.
    pub fn redeliver(&self, delivery: Delivery<T>) -> bool {
        let Some(tx) = self.retry.upgrade() else {
            return false;
        };
        tx.send(Delivery {
            job: delivery.job,
            attempt: delivery.attempt + 1,
        })
        .is_ok()
    }
}

/// Create a named queue.
pub fn channel<T>(name: &'static str) -> (JobQueue<T>, JobReceiver<T>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let retry = tx.downgrade();
    (
        JobQueue { name, tx },
        JobReceiver { name, rx, retry },
    )
}
