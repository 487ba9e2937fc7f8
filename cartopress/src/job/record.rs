//! The job record - one generation request and its mutable processing state.

use super::{BatchId, JobId, PosterId, ProgressStep};
use crate::format::PageSpec;
use crate::job::JobStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Machine-readable error details recorded on a failed job.
///
/// Written before the orchestrator returns, so a job's failure is always
/// introspectable from the store without consulting external logs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobErrorInfo {
    /// Error classification (e.g. "FetchFailed", "QueueError").
    pub kind: String,

    /// Human-readable error message.
    pub message: String,

    /// Full error chain, outermost first.
    pub trace: String,
}

/// Tagged result payload, present if and only if the job completed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum JobOutcome {
    /// The job produced a poster.
    Completed {
        /// Id of the poster record created for this job.
        poster_id: PosterId,
    },
}

/// One poster-generation request.
///
/// Created `Pending` by the request producer, mutated only by the orchestrator
/// that owns it, and never deleted by the core.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JobRecord {
    /// Unique identifier.
    pub id: JobId,

    /// Requested city name.
    pub city: String,

    /// Requested country name.
    pub country: String,

    /// Theme identifier to render with.
    pub theme: String,

    /// Map radius in meters around the centre point.
    pub distance: u32,

    /// Centre latitude.
    pub latitude: f64,

    /// Centre longitude.
    pub longitude: f64,

    /// Lower-resolution preview render.
    pub preview: bool,

    /// Page format, orientation, DPI, and optional custom dimensions.
    pub page: PageSpec,

    /// Current lifecycle state.
    pub status: JobStatus,

    /// Overall progress percentage (0-100), non-decreasing while processing.
    pub progress: u8,

    /// Description of the step currently underway.
    pub current_step: Option<String>,

    /// Append-only log of recorded steps.
    pub progress_steps: Vec<ProgressStep>,

    /// Session that created the request.
    pub session_id: Option<String>,

    /// Set when this job was created as part of a batch request.
    pub batch_id: Option<BatchId>,

    /// When the job record was created.
    pub created_at: DateTime<Utc>,

    /// When an orchestrator picked the job up.
    pub started_at: Option<DateTime<Utc>>,

    /// Set exactly when the job transitions to Completed.
    pub completed_at: Option<DateTime<Utc>>,

    /// Set when the job transitions to Failed or Cancelled.
    pub failed_at: Option<DateTime<Utc>>,

    /// Error details, present on failed jobs.
    pub error: Option<JobErrorInfo>,

    /// Success payload, present iff status is Completed.
    pub outcome: Option<JobOutcome>,
}

impl JobRecord {
    /// Creates a fresh pending job.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        city: impl Into<String>,
        country: impl Into<String>,
        theme: impl Into<String>,
        distance: u32,
        latitude: f64,
        longitude: f64,
        preview: bool,
        page: PageSpec,
        session_id: Option<String>,
    ) -> Self {
        Self {
            id: JobId::fresh(),
            city: city.into(),
            country: country.into(),
            theme: theme.into(),
            distance,
            latitude,
            longitude,
            preview,
            page,
            status: JobStatus::Pending,
            progress: 0,
            current_step: None,
            progress_steps: Vec::new(),
            session_id,
            batch_id: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            failed_at: None,
            error: None,
            outcome: None,
        }
    }

    /// Transitions the job to Processing, stamping `started_at` and resetting
    /// the progress log.
    pub fn mark_processing(&mut self) {
        self.status = JobStatus::Processing;
        self.started_at = Some(Utc::now());
        self.progress_steps.clear();
    }

    /// Transitions the job to Completed with the given poster reference.
    ///
    /// Sets progress to 100 and `completed_at`; the outcome payload is the
    /// only place the poster id appears on the job.
    pub fn mark_completed(&mut self, poster_id: PosterId) {
        self.status = JobStatus::Completed;
        self.progress = 100;
        self.completed_at = Some(Utc::now());
        self.outcome = Some(JobOutcome::Completed { poster_id });
    }

    /// Transitions the job to Failed, recording the error classification.
    pub fn mark_failed(&mut self, kind: impl Into<String>, message: impl Into<String>, trace: impl Into<String>) {
        self.status = JobStatus::Failed;
        self.failed_at = Some(Utc::now());
        self.error = Some(JobErrorInfo {
            kind: kind.into(),
            message: message.into(),
            trace: trace.into(),
        });
    }

    /// Transitions the job to Cancelled.
    ///
    /// Cancellation sets `failed_at` (the job will never complete), without
    /// recording an error.
    pub fn mark_cancelled(&mut self) {
        self.status = JobStatus::Cancelled;
        self.failed_at = Some(Utc::now());
    }

    /// Wall-clock duration of a completed job, if it both started and finished.
    pub fn duration_secs(&self) -> Option<i64> {
        match (self.started_at, self.completed_at) {
            (Some(start), Some(end)) => Some((end - start).num_seconds()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::PageSpec;

    fn sample_job() -> JobRecord {
        JobRecord::new(
            "Paris",
            "France",
            "noir",
            29_000,
            48.8566,
            2.3522,
            false,
            PageSpec::default(),
            Some("sess-1".to_string()),
        )
    }

    #[test]
    fn test_new_job_is_pending() {
        let job = sample_job();
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.progress, 0);
        assert!(job.outcome.is_none());
        assert!(job.batch_id.is_none());
    }

    #[test]
    fn test_mark_processing_resets_steps() {
        let mut job = sample_job();
        job.progress_steps
            .push(ProgressStep::now("stale", crate::job::StepStatus::Pending, 1));

        job.mark_processing();

        assert_eq!(job.status, JobStatus::Processing);
        assert!(job.started_at.is_some());
        assert!(job.progress_steps.is_empty());
    }

    #[test]
    fn test_mark_completed_sets_outcome() {
        let mut job = sample_job();
        job.mark_processing();
        let poster_id = PosterId::fresh();

        job.mark_completed(poster_id.clone());

        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.progress, 100);
        assert!(job.completed_at.is_some());
        assert!(job.failed_at.is_none());
        assert_eq!(job.outcome, Some(JobOutcome::Completed { poster_id }));
    }

    #[test]
    fn test_mark_failed_records_error() {
        let mut job = sample_job();
        job.mark_processing();

        job.mark_failed("FetchFailed", "street download failed", "FetchFailed: timeout");

        assert_eq!(job.status, JobStatus::Failed);
        assert!(job.failed_at.is_some());
        assert!(job.completed_at.is_none());
        let err = job.error.expect("error info");
        assert_eq!(err.kind, "FetchFailed");
    }

    #[test]
    fn test_mark_cancelled_sets_failed_at() {
        let mut job = sample_job();
        job.mark_cancelled();
        assert_eq!(job.status, JobStatus::Cancelled);
        assert!(job.failed_at.is_some());
        assert!(job.error.is_none());
    }

    #[test]
    fn test_duration_needs_both_timestamps() {
        let mut job = sample_job();
        assert_eq!(job.duration_secs(), None);
        job.mark_processing();
        assert_eq!(job.duration_secs(), None);
        job.mark_completed(PosterId::fresh());
        assert!(job.duration_secs().is_some());
    }
}
