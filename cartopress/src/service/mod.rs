//! Public facade consumed by the API layer.
//!
//! [`PosterService`] is the boundary between request handling (out of scope
//! here) and the pipelines: it creates job records, hands work to the task
//! queue, answers status queries with serializable views, and processes
//! cancellation requests. It deliberately knows nothing about rendering or
//! fetching - those live behind the queue.

mod view;

pub use view::{BatchView, JobView, PosterResult};

use crate::error::OrchestrationError;
use crate::format::PageSpec;
use crate::job::{BatchId, JobId, JobRecord, JobStatus};
use crate::queue::{TaskQueue, WorkItem};
use crate::store::{JobStore, StoreError};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Rough per-poster duration estimate for preview renders, in seconds.
pub const PREVIEW_ESTIMATE_SECS: u32 = 15;

/// Rough per-poster duration estimate for full-resolution renders, in seconds.
pub const FULL_ESTIMATE_SECS: u32 = 45;

/// Batch estimates assume the shared fetch saves roughly 30% per poster.
const BATCH_ESTIMATE_FACTOR: f64 = 0.7;

/// Parameters for a new poster job.
#[derive(Clone, Debug)]
pub struct CreateJobRequest {
    /// City to map.
    pub city: String,
    /// Country the city is in.
    pub country: String,
    /// Theme id to render with. Ignored by [`PosterService::create_batch`],
    /// which takes its themes separately.
    pub theme: String,
    /// Map radius in meters.
    pub distance: u32,
    /// Latitude, or 0.0 when geocoding should resolve it.
    pub latitude: f64,
    /// Longitude, or 0.0 when geocoding should resolve it.
    pub longitude: f64,
    /// Lower-resolution preview render.
    pub preview: bool,
    /// Page geometry.
    pub page: PageSpec,
    /// Session identifier for tracking, if any.
    pub session_id: Option<String>,
}

/// Acknowledgement returned when a job is accepted.
#[derive(Clone, Debug, Serialize)]
pub struct JobTicket {
    /// The new job's id.
    pub job_id: JobId,
    /// Status at acceptance time (always Pending).
    pub status: JobStatus,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Rough wall-clock estimate until completion.
    pub estimated_duration_secs: u32,
}

/// Acknowledgement returned when a batch is accepted.
#[derive(Clone, Debug, Serialize)]
pub struct BatchTicket {
    /// The batch id shared by every member job.
    pub batch_id: BatchId,
    /// Member job ids, in theme order.
    pub job_ids: Vec<JobId>,
    /// The themes being rendered.
    pub themes: Vec<String>,
    /// Convenience count of `themes`.
    pub total_themes: usize,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Rough wall-clock estimate until the whole batch finishes.
    pub estimated_duration_secs: u32,
}

/// Job creation, status, and cancellation over a store and a task queue.
pub struct PosterService {
    store: Arc<dyn JobStore>,
    queue: Arc<dyn TaskQueue>,
}

impl PosterService {
    /// Creates a service over the given store and queue.
    pub fn new(store: Arc<dyn JobStore>, queue: Arc<dyn TaskQueue>) -> Self {
        Self { store, queue }
    }

    /// Creates and enqueues a single poster job.
    ///
    /// If the queue hand-off fails the job is marked Failed before this
    /// returns, so status readers never see a Pending job that will never
    /// run.
    pub async fn create_job(
        &self,
        request: CreateJobRequest,
    ) -> Result<JobTicket, OrchestrationError> {
        let job = JobRecord::new(
            &request.city,
            &request.country,
            &request.theme,
            request.distance,
            request.latitude,
            request.longitude,
            request.preview,
            request.page,
            request.session_id.clone(),
        );
        self.store.save_job(&job)?;
        info!(job_id = %job.id, city = %job.city, country = %job.country, "job created");

        if let Err(msg) = self.queue.enqueue(WorkItem::Job(job.id.clone())).await {
            let err = OrchestrationError::Queue(msg);
            error!(job_id = %job.id, error = %err, "queue hand-off failed");
            self.fail_unqueued(&job.id, &err);
            return Err(err);
        }

        Ok(JobTicket {
            job_id: job.id,
            status: JobStatus::Pending,
            created_at: job.created_at,
            estimated_duration_secs: per_poster_estimate(request.preview),
        })
    }

    /// Creates one job per theme under a shared batch id and enqueues the
    /// batch as a single unit of work.
    pub async fn create_batch(
        &self,
        request: CreateJobRequest,
        themes: &[String],
    ) -> Result<BatchTicket, OrchestrationError> {
        let batch_id = BatchId::fresh();
        let created_at = Utc::now();

        let mut job_ids = Vec::with_capacity(themes.len());
        for theme in themes {
            let mut job = JobRecord::new(
                &request.city,
                &request.country,
                theme,
                request.distance,
                request.latitude,
                request.longitude,
                request.preview,
                request.page,
                request.session_id.clone(),
            );
            job.batch_id = Some(batch_id.clone());
            self.store.save_job(&job)?;
            job_ids.push(job.id);
        }
        info!(%batch_id, members = job_ids.len(), city = %request.city, "batch created");

        let item = WorkItem::Batch(batch_id.clone(), job_ids.clone());
        if let Err(msg) = self.queue.enqueue(item).await {
            let err = OrchestrationError::Queue(msg);
            error!(%batch_id, error = %err, "batch queue hand-off failed");
            for job_id in &job_ids {
                self.fail_unqueued(job_id, &err);
            }
            return Err(err);
        }

        let per_poster = per_poster_estimate(request.preview) as f64;
        let estimated = (per_poster * BATCH_ESTIMATE_FACTOR * themes.len() as f64) as u32;
        Ok(BatchTicket {
            batch_id,
            job_ids,
            themes: themes.to_vec(),
            total_themes: themes.len(),
            created_at,
            estimated_duration_secs: estimated,
        })
    }

    /// Current status view of a job, or `None` if it does not exist.
    pub fn job_status(&self, job_id: &JobId) -> Result<Option<JobView>, StoreError> {
        let Some(job) = self.store.get_job(job_id)? else {
            return Ok(None);
        };
        Ok(Some(self.view_of(&job)))
    }

    /// Cancels a Pending or Processing job.
    ///
    /// Revocation of the running task is best-effort; the record is marked
    /// Cancelled regardless of whether a task was still there to revoke.
    /// Returns false for unknown or already-terminal jobs - callers must not
    /// treat that as an error.
    pub fn cancel_job(&self, job_id: &JobId) -> Result<bool, StoreError> {
        let Some(mut job) = self.store.get_job(job_id)? else {
            return Ok(false);
        };
        if !job.status.can_cancel() {
            info!(%job_id, status = %job.status, "cancel request for terminal job ignored");
            return Ok(false);
        }

        let revoked = self.queue.revoke(job_id.as_str());
        job.mark_cancelled();
        self.store.save_job(&job)?;
        info!(%job_id, revoked, "job cancelled");
        Ok(true)
    }

    /// Derived status of a batch, or `None` when no member jobs exist.
    ///
    /// A batch is never stored: its view is computed by scanning member jobs
    /// every time.
    pub fn batch_status(&self, batch_id: &BatchId) -> Result<Option<BatchView>, StoreError> {
        let jobs = self.store.get_jobs_by_batch(batch_id)?;
        if jobs.is_empty() {
            return Ok(None);
        }

        let first = &jobs[0];
        let view = BatchView {
            batch_id: batch_id.clone(),
            city: first.city.clone(),
            country: first.country.clone(),
            themes: jobs.iter().map(|job| job.theme.clone()).collect(),
            total_themes: jobs.len(),
            created_at: first.created_at,
            jobs: jobs.iter().map(|job| self.view_of(job)).collect(),
        };
        Ok(Some(view))
    }

    fn view_of(&self, job: &JobRecord) -> JobView {
        let result = job.outcome.as_ref().and_then(|outcome| {
            let crate::job::JobOutcome::Completed { poster_id } = outcome;
            match self.store.get_poster(poster_id) {
                Ok(Some(poster)) => Some(PosterResult::from(&poster)),
                Ok(None) => {
                    warn!(job_id = %job.id, %poster_id, "completed job references missing poster");
                    None
                }
                Err(err) => {
                    warn!(job_id = %job.id, error = %err, "poster lookup failed for status view");
                    None
                }
            }
        });
        JobView::new(job, result)
    }

    /// Marks a job Failed after the queue refused it.
    fn fail_unqueued(&self, job_id: &JobId, err: &OrchestrationError) {
        match self.store.get_job(job_id) {
            Ok(Some(mut job)) => {
                job.mark_failed(err.kind(), err.to_string(), err.trace());
                if let Err(save_err) = self.store.save_job(&job) {
                    warn!(%job_id, error = %save_err, "failed to record queue failure");
                }
            }
            Ok(None) => warn!(%job_id, "job vanished before queue failure could be recorded"),
            Err(lookup_err) => {
                warn!(%job_id, error = %lookup_err, "failed to load job for queue failure")
            }
        }
    }
}

fn per_poster_estimate(preview: bool) -> u32 {
    if preview {
        PREVIEW_ESTIMATE_SECS
    } else {
        FULL_ESTIMATE_SECS
    }
}
