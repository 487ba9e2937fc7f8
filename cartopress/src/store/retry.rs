//! Eventual-consistency lookup retries.
//!
//! A job enqueued by one process may not yet be visible to the worker that
//! picks it up. Rather than each orchestrator carrying its own retry loop,
//! [`RetryingStore`] wraps any [`JobStore`] with the shared discipline:
//! bounded attempts, fixed backoff, and an explicit read-cache invalidation
//! before every retry.

use super::{JobStore, StoreError};
use crate::error::OrchestrationError;
use crate::job::{JobId, JobRecord};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Lookup attempts before declaring the job unreachable.
pub const LOOKUP_ATTEMPTS: u32 = 5;

/// Fixed backoff between lookup attempts.
pub const LOOKUP_BACKOFF: Duration = Duration::from_millis(500);

/// A [`JobStore`] wrapper that retries job lookups.
pub struct RetryingStore {
    inner: Arc<dyn JobStore>,
    attempts: u32,
    backoff: Duration,
}

impl RetryingStore {
    /// Wraps a store with the default retry policy.
    pub fn new(inner: Arc<dyn JobStore>) -> Self {
        Self::with_policy(inner, LOOKUP_ATTEMPTS, LOOKUP_BACKOFF)
    }

    /// Wraps a store with an explicit attempt count and backoff.
    pub fn with_policy(inner: Arc<dyn JobStore>, attempts: u32, backoff: Duration) -> Self {
        Self {
            inner,
            attempts,
            backoff,
        }
    }

    /// The wrapped store, for direct (non-retrying) operations.
    pub fn inner(&self) -> &Arc<dyn JobStore> {
        &self.inner
    }

    /// Looks up a job, retrying until it becomes visible.
    ///
    /// Before each retry the wrapped store's read cache is invalidated, so
    /// the next attempt sees the freshest committed state. Store errors on an
    /// attempt count against the budget like a miss - a flaky store should not
    /// abort the task any faster than an invisible job does.
    pub async fn get_job_with_retry(
        &self,
        id: &JobId,
    ) -> Result<JobRecord, OrchestrationError> {
        for attempt in 1..=self.attempts {
            self.inner.invalidate_read_cache();

            match self.inner.get_job(id) {
                Ok(Some(job)) => return Ok(job),
                Ok(None) => {
                    if attempt < self.attempts {
                        warn!(
                            job_id = %id,
                            attempt,
                            max_attempts = self.attempts,
                            "job not found, retrying"
                        );
                    }
                }
                Err(err) => {
                    warn!(job_id = %id, attempt, error = %err, "store lookup failed, retrying");
                }
            }

            if attempt < self.attempts {
                tokio::time::sleep(self.backoff).await;
            }
        }

        Err(OrchestrationError::LookupExhausted {
            job_id: id.to_string(),
            attempts: self.attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::PageSpec;
    use crate::job::{BatchId, PosterId, PosterRecord};
    use crate::store::MemoryStore;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Store double that stays empty for the first N lookups.
    struct LateStore {
        inner: MemoryStore,
        visible_after: u32,
        lookups: AtomicU32,
        invalidations: AtomicU32,
    }

    impl LateStore {
        fn new(visible_after: u32) -> Self {
            Self {
                inner: MemoryStore::new(),
                visible_after,
                lookups: AtomicU32::new(0),
                invalidations: AtomicU32::new(0),
            }
        }
    }

    impl JobStore for LateStore {
        fn get_job(&self, id: &JobId) -> Result<Option<JobRecord>, StoreError> {
            let seen = self.lookups.fetch_add(1, Ordering::SeqCst) + 1;
            if seen <= self.visible_after {
                return Ok(None);
            }
            self.inner.get_job(id)
        }

        fn save_job(&self, job: &JobRecord) -> Result<(), StoreError> {
            self.inner.save_job(job)
        }

        fn get_poster(&self, id: &PosterId) -> Result<Option<PosterRecord>, StoreError> {
            self.inner.get_poster(id)
        }

        fn create_poster(&self, poster: &PosterRecord) -> Result<(), StoreError> {
            self.inner.create_poster(poster)
        }

        fn get_jobs_by_batch(&self, batch_id: &BatchId) -> Result<Vec<JobRecord>, StoreError> {
            self.inner.get_jobs_by_batch(batch_id)
        }

        fn complete_with_poster(
            &self,
            job: &JobRecord,
            poster: &PosterRecord,
        ) -> Result<(), StoreError> {
            self.inner.complete_with_poster(job, poster)
        }

        fn invalidate_read_cache(&self) {
            self.invalidations.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn sample_job() -> JobRecord {
        JobRecord::new(
            "Oslo",
            "Norway",
            "noir",
            12_000,
            59.9139,
            10.7522,
            false,
            PageSpec::default(),
            None,
        )
    }

    #[tokio::test]
    async fn test_returns_job_once_visible() {
        let store = Arc::new(LateStore::new(2));
        let job = sample_job();
        store.save_job(&job).unwrap();

        let retrying =
            RetryingStore::with_policy(store.clone(), 5, Duration::from_millis(1));
        let found = retrying.get_job_with_retry(&job.id).await.unwrap();

        assert_eq!(found.id, job.id);
        assert_eq!(store.lookups.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_invalidates_cache_before_every_attempt() {
        let store = Arc::new(LateStore::new(0));
        let job = sample_job();
        store.save_job(&job).unwrap();

        let retrying =
            RetryingStore::with_policy(store.clone(), 5, Duration::from_millis(1));
        retrying.get_job_with_retry(&job.id).await.unwrap();

        assert_eq!(store.invalidations.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_exhaustion_yields_lookup_exhausted() {
        let store = Arc::new(LateStore::new(u32::MAX));
        let retrying =
            RetryingStore::with_policy(store.clone(), 5, Duration::from_millis(1));

        let err = retrying
            .get_job_with_retry(&JobId::new("ghost"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            OrchestrationError::LookupExhausted { attempts: 5, .. }
        ));
        assert_eq!(store.lookups.load(Ordering::SeqCst), 5);
        assert_eq!(store.invalidations.load(Ordering::SeqCst), 5);
    }
}
