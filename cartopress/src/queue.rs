//! Hand-off of orchestration work to the async runtime.
//!
//! [`TaskQueue`] is the seam between job creation and job execution: the
//! service layer enqueues a [`WorkItem`] and the queue decides where it runs.
//! [`SpawningQueue`] is the production implementation (one spawned task per
//! item, revocable through a cancellation token). [`EagerQueue`] runs the item
//! to completion inside `enqueue` itself and exists for deterministic tests.

use crate::job::{BatchId, JobId};
use dashmap::DashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// A unit of orchestration work.
#[derive(Debug, Clone)]
pub enum WorkItem {
    /// Run the pipeline for a single job.
    Job(JobId),
    /// Run the shared-fetch pipeline for a batch and its member jobs.
    Batch(BatchId, Vec<JobId>),
}

impl WorkItem {
    /// Revocation key for this item (the job id, or the batch id).
    pub fn key(&self) -> &str {
        match self {
            Self::Job(id) => id.as_str(),
            Self::Batch(id, _) => id.as_str(),
        }
    }
}

/// Executes a work item. Implemented by the orchestration layer.
pub trait WorkRunner: Send + Sync + 'static {
    /// Runs the item to completion, honouring `cancel` at stage boundaries.
    fn run(
        &self,
        item: WorkItem,
        cancel: CancellationToken,
    ) -> Pin<Box<dyn Future<Output = ()> + Send + '_>>;
}

/// Hands orchestration work to the runtime and cancels it again.
pub trait TaskQueue: Send + Sync {
    /// Accepts a work item for execution.
    ///
    /// A returned error means the hand-off itself failed and the item will
    /// never run; the caller is responsible for failing the affected jobs.
    fn enqueue(
        &self,
        item: WorkItem,
    ) -> Pin<Box<dyn Future<Output = Result<(), String>> + Send + '_>>;

    /// Signals the runtime to stop the item with the given key.
    ///
    /// Best-effort: returns true when a running item was signalled. The
    /// record-level Cancelled transition is the caller's job either way.
    fn revoke(&self, key: &str) -> bool;
}

/// Production queue: one spawned tokio task per work item.
pub struct SpawningQueue {
    runner: Arc<dyn WorkRunner>,
    active: Arc<DashMap<String, CancellationToken>>,
}

impl SpawningQueue {
    /// Creates a queue dispatching to `runner`.
    pub fn new(runner: Arc<dyn WorkRunner>) -> Self {
        Self {
            runner,
            active: Arc::new(DashMap::new()),
        }
    }

    /// Number of items currently running.
    pub fn active_count(&self) -> usize {
        self.active.len()
    }
}

impl TaskQueue for SpawningQueue {
    fn enqueue(
        &self,
        item: WorkItem,
    ) -> Pin<Box<dyn Future<Output = Result<(), String>> + Send + '_>> {
        Box::pin(async move {
            let key = item.key().to_string();
            let token = CancellationToken::new();
            self.active.insert(key.clone(), token.clone());

            let runner = Arc::clone(&self.runner);
            let active = Arc::clone(&self.active);
            tokio::spawn(async move {
                debug!(key = %key, "work item started");
                runner.run(item, token).await;
                active.remove(&key);
                debug!(key = %key, "work item finished");
            });
            Ok(())
        })
    }

    fn revoke(&self, key: &str) -> bool {
        match self.active.get(key) {
            Some(entry) => {
                entry.value().cancel();
                info!(key, "work item revoked");
                true
            }
            None => {
                debug!(key, "revoke for unknown or finished work item");
                false
            }
        }
    }
}

/// Test queue: runs the item to completion before `enqueue` returns.
pub struct EagerQueue {
    runner: Arc<dyn WorkRunner>,
}

impl EagerQueue {
    /// Creates a queue that executes inline.
    pub fn new(runner: Arc<dyn WorkRunner>) -> Self {
        Self { runner }
    }
}

impl TaskQueue for EagerQueue {
    fn enqueue(
        &self,
        item: WorkItem,
    ) -> Pin<Box<dyn Future<Output = Result<(), String>> + Send + '_>> {
        Box::pin(async move {
            self.runner.run(item, CancellationToken::new()).await;
            Ok(())
        })
    }

    fn revoke(&self, key: &str) -> bool {
        // Nothing is ever in flight once enqueue has returned.
        warn!(key, "revoke on eager queue is a no-op");
        false
    }
}
