//! In-memory store backed by concurrent maps.
//!
//! Used by tests and the inline runtime. Strongly consistent - the
//! eventual-consistency behaviours the retry wrapper exists for are simulated
//! in tests with purpose-built store doubles.

use super::{JobStore, StoreError};
use crate::job::{BatchId, JobId, JobRecord, PosterId, PosterRecord};
use dashmap::DashMap;

/// Dashmap-backed store for jobs and posters.
pub struct MemoryStore {
    jobs: DashMap<JobId, JobRecord>,
    posters: DashMap<PosterId, PosterRecord>,
    poster_by_job: DashMap<JobId, PosterId>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            jobs: DashMap::new(),
            posters: DashMap::new(),
            poster_by_job: DashMap::new(),
        }
    }

    /// Number of job records held.
    pub fn job_count(&self) -> usize {
        self.jobs.len()
    }

    /// Number of poster records held.
    pub fn poster_count(&self) -> usize {
        self.posters.len()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl JobStore for MemoryStore {
    fn get_job(&self, id: &JobId) -> Result<Option<JobRecord>, StoreError> {
        Ok(self.jobs.get(id).map(|entry| entry.clone()))
    }

    fn save_job(&self, job: &JobRecord) -> Result<(), StoreError> {
        self.jobs.insert(job.id.clone(), job.clone());
        Ok(())
    }

    fn get_poster(&self, id: &PosterId) -> Result<Option<PosterRecord>, StoreError> {
        Ok(self.posters.get(id).map(|entry| entry.clone()))
    }

    fn create_poster(&self, poster: &PosterRecord) -> Result<(), StoreError> {
        if self.poster_by_job.contains_key(&poster.job_id) {
            return Err(StoreError::PosterExists(poster.job_id.clone()));
        }
        self.poster_by_job
            .insert(poster.job_id.clone(), poster.id.clone());
        self.posters.insert(poster.id.clone(), poster.clone());
        Ok(())
    }

    fn get_jobs_by_batch(&self, batch_id: &BatchId) -> Result<Vec<JobRecord>, StoreError> {
        let mut jobs: Vec<JobRecord> = self
            .jobs
            .iter()
            .filter(|entry| entry.batch_id.as_ref() == Some(batch_id))
            .map(|entry| entry.clone())
            .collect();
        jobs.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(jobs)
    }

    fn complete_with_poster(
        &self,
        job: &JobRecord,
        poster: &PosterRecord,
    ) -> Result<(), StoreError> {
        // Poster first so a duplicate is caught before the job flips state.
        self.create_poster(poster)?;
        self.save_job(job)
    }

    fn invalidate_read_cache(&self) {
        // No read cache - lookups always hit the maps.
    }
}
