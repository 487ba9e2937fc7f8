//! Job and poster persistence boundary.
//!
//! The store is a transactional resource owned by the surrounding deployment
//! (relational database, document store, ...). The core consumes it through
//! the [`JobStore`] trait; each state transition commits independently so
//! partial progress survives a crash mid-pipeline and is observable by status
//! readers.
//!
//! Job creation and job processing may run in different processes with
//! eventually-consistent visibility of the shared store. [`RetryingStore`]
//! wraps any `JobStore` with the lookup-retry discipline both orchestrators
//! share.

mod memory;
mod retry;

pub use memory::MemoryStore;
pub use retry::{RetryingStore, LOOKUP_ATTEMPTS, LOOKUP_BACKOFF};

use crate::job::{BatchId, JobId, JobRecord, PosterId, PosterRecord};
use thiserror::Error;

/// Store failures.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store could not be reached or rejected the operation.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A poster already exists for the job (posters are 1:1 with jobs).
    #[error("poster already exists for job {0}")]
    PosterExists(JobId),
}

/// Persistence capability for jobs and posters.
///
/// Implementations are assumed eventually consistent across processes: a
/// record committed by one process may take a moment to become visible to
/// another. Readers that cannot tolerate that use [`RetryingStore`].
pub trait JobStore: Send + Sync {
    /// Fetches a job by id. `Ok(None)` means the job is not (yet) visible.
    fn get_job(&self, id: &JobId) -> Result<Option<JobRecord>, StoreError>;

    /// Creates or replaces a job record.
    fn save_job(&self, job: &JobRecord) -> Result<(), StoreError>;

    /// Fetches a poster by id.
    fn get_poster(&self, id: &PosterId) -> Result<Option<PosterRecord>, StoreError>;

    /// Creates a poster record. Fails if the job already has one.
    fn create_poster(&self, poster: &PosterRecord) -> Result<(), StoreError>;

    /// Returns all member jobs of a batch, in creation order.
    fn get_jobs_by_batch(&self, batch_id: &BatchId) -> Result<Vec<JobRecord>, StoreError>;

    /// Atomically persists the poster and the completed job state together.
    ///
    /// This is the success-path commit: either both records land or neither
    /// does.
    fn complete_with_poster(
        &self,
        job: &JobRecord,
        poster: &PosterRecord,
    ) -> Result<(), StoreError>;

    /// Drops any process-local read cache so the next lookup hits the backing
    /// store. A no-op for implementations without one.
    fn invalidate_read_cache(&self);
}
