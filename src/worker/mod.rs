//! Background workers.
//!
//! Each worker drains one [`queue`] with a single consumer task. Jobs that
//! fail are logged and redelivered until the attempt budget is spent.

pub mod queue;
mod thumbnail;
mod welcome;

pub use queue::{channel, Delivery, JobQueue, JobReceiver};
pub use thumbnail::{generate_thumbnails, ThumbnailJob, ThumbnailWorker, THUMBNAIL_QUEUE};
pub use welcome::{WelcomeJob, WelcomeWorker, WELCOME_QUEUE};

use std::fmt;

use async_trait::async_trait;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::db::Database;
use crate::Result;

/// Job payload errors.
#[derive(Error, Debug)]
pub enum JobError {
    #[error("Missing fileId")]
    MissingFileId,
    #[error("Missing userId")]
    MissingUserId,
    #[error("File not found")]
    FileNotFound,
    #[error("User not found")]
    UserNotFound,
    /// The blocking task running the job panicked or was cancelled.
    #[error("worker task aborted: {0}")]
    Aborted(String),
}

/// Processes the jobs of one queue.
#[async_trait]
pub trait JobHandler: Send + Sync + 'static {
    type Job: fmt::Debug + Send + Sync + 'static;

    async fn handle(&self, job: &Self::Job) -> Result<()>;
}

/// Outcome counts of a worker loop.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WorkerStats {
    pub completed: u64,
    pub failed: u64,
    pub redelivered: u64,
}

/// Drain a queue until every producer is dropped.
///
/// A failed job is put back while its attempt number is below
/// `max_attempts`; otherwise it counts as failed.
pub async fn run<H: JobHandler>(
    handler: H,
    mut receiver: JobReceiver<H::Job>,
    max_attempts: u32,
) -> WorkerStats {
    let queue = receiver.name();
    info!(queue, max_attempts, "Worker started");

    let mut stats = WorkerStats::default();
    while let Some(delivery) = receiver.recv().await {
        match handler.handle(&delivery.job).await {
            Ok(()) => {
                stats.completed += 1;
                debug!(queue, attempt = delivery.attempt, "Job completed");
            }
            Err(e) => {
                warn!(
                    queue,
                    attempt = delivery.attempt,
                    job = ?delivery.job,
                    error = %e,
                    "Job failed"
                );
                if delivery.attempt < max_attempts && receiver.redeliver(delivery) {
                    stats.redelivered += 1;
                } else {
                    stats.failed += 1;
                }
            }
        }
    }

    info!(
        queue,
        completed = stats.completed,
        failed = stats.failed,
        "Worker stopped"
    );
    stats
}

/// Consumers of the application queues, ready to be spawned.
pub struct Workers {
    db: Database,
    thumbnails: JobReceiver<ThumbnailJob>,
    welcome: JobReceiver<WelcomeJob>,
    thumbnail_attempts: u32,
}

impl Workers {
    pub fn new(
        db: Database,
        thumbnails: JobReceiver<ThumbnailJob>,
        welcome: JobReceiver<WelcomeJob>,
        thumbnail_attempts: u32,
    ) -> Self {
        Self {
            db,
            thumbnails,
            welcome,
            thumbnail_attempts,
        }
    }

    /// Spawn one task per queue.
    pub fn spawn(self) -> Vec<JoinHandle<WorkerStats>> {
        vec![
            tokio::spawn(run(
                ThumbnailWorker::new(self.db.clone()),
                self.thumbnails,
                self.thumbnail_attempts,
            )),
            tokio::spawn(run(WelcomeWorker::new(self.db), self.welcome, 1)),
        ]
    }
}
