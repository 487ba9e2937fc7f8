//! Pipeline orchestration.
//!
//! [`JobOrchestrator`] drives a single job through geocode → fetch → render →
//! persist; [`BatchOrchestrator`] does the same for a set of themes sharing
//! one location and one fetch. Both run over an [`OrchestratorContext`], the
//! collaborator set wired once at startup. [`PipelineRunner`] adapts them to
//! the task queue's [`WorkRunner`] seam.

mod batch;
mod context;
mod job;

pub use batch::BatchOrchestrator;
pub use context::OrchestratorContext;
pub use job::JobOrchestrator;

use crate::queue::{WorkItem, WorkRunner};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Dispatches dequeued work items to the matching orchestrator.
pub struct PipelineRunner {
    ctx: Arc<OrchestratorContext>,
}

impl PipelineRunner {
    /// Creates a runner over the shared context.
    pub fn new(ctx: Arc<OrchestratorContext>) -> Self {
        Self { ctx }
    }
}

impl WorkRunner for PipelineRunner {
    fn run(
        &self,
        item: WorkItem,
        cancel: CancellationToken,
    ) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(async move {
            match item {
                WorkItem::Job(job_id) => {
                    JobOrchestrator::new(Arc::clone(&self.ctx))
                        .run(&job_id, &cancel)
                        .await;
                }
                WorkItem::Batch(batch_id, job_ids) => {
                    BatchOrchestrator::new(Arc::clone(&self.ctx))
                        .run(&batch_id, &job_ids, &cancel)
                        .await;
                }
            }
        })
    }
}
