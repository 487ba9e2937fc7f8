//! Serializable status views handed to the API layer.

use crate::job::{BatchId, JobErrorInfo, JobId, JobRecord, JobStatus, PosterRecord, ProgressStep};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;

/// Success payload attached to a Completed job's view.
#[derive(Clone, Debug, Serialize)]
pub struct PosterResult {
    /// The poster row backing this result.
    pub poster_id: crate::job::PosterId,
    /// Stored filename.
    pub filename: String,
    /// File size in bytes.
    pub file_size: u64,
    /// Rendered width in pixels.
    pub width_px: u32,
    /// Rendered height in pixels.
    pub height_px: u32,
    /// Thumbnail location, when one was generated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_path: Option<PathBuf>,
}

impl From<&PosterRecord> for PosterResult {
    fn from(poster: &PosterRecord) -> Self {
        Self {
            poster_id: poster.id.clone(),
            filename: poster.filename.clone(),
            file_size: poster.file_size,
            width_px: poster.width_px,
            height_px: poster.height_px,
            thumbnail_path: poster.thumbnail_path.clone(),
        }
    }
}

/// Point-in-time status of one job.
#[derive(Clone, Debug, Serialize)]
pub struct JobView {
    /// The job's id.
    pub job_id: JobId,
    /// City being mapped.
    pub city: String,
    /// Country the city is in.
    pub country: String,
    /// Theme id.
    pub theme: String,
    /// Map radius in meters.
    pub distance: u32,
    /// Latitude (0.0 until geocoded).
    pub latitude: f64,
    /// Longitude (0.0 until geocoded).
    pub longitude: f64,
    /// Lifecycle state.
    pub status: JobStatus,
    /// Percent complete, 0-100, non-decreasing.
    pub progress: u8,
    /// Human-readable current step.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_step: Option<String>,
    /// Append-only step history.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub progress_steps: Vec<ProgressStep>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// When processing began.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    /// When the job completed, if it did.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    /// When the job failed or was cancelled, if it was.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_at: Option<DateTime<Utc>>,
    /// Wall-clock processing time, present once completed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<i64>,
    /// Failure details, present once failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JobErrorInfo>,
    /// Always true on failure: resubmitting a fresh request is safe.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_allowed: Option<bool>,
    /// Success payload, present once completed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<PosterResult>,
}

impl JobView {
    /// Builds a view from a record and its resolved result payload.
    pub(crate) fn new(job: &JobRecord, result: Option<PosterResult>) -> Self {
        Self {
            job_id: job.id.clone(),
            city: job.city.clone(),
            country: job.country.clone(),
            theme: job.theme.clone(),
            distance: job.distance,
            latitude: job.latitude,
            longitude: job.longitude,
            status: job.status,
            progress: job.progress,
            current_step: job.current_step.clone(),
            progress_steps: job.progress_steps.clone(),
            created_at: job.created_at,
            started_at: job.started_at,
            completed_at: job.completed_at,
            failed_at: job.failed_at,
            duration_secs: job.duration_secs(),
            error: job.error.clone(),
            retry_allowed: job.error.as_ref().map(|_| true),
            result,
        }
    }
}

/// Derived status of a batch: nothing here is stored, everything is computed
/// from the member jobs at read time.
#[derive(Clone, Debug, Serialize)]
pub struct BatchView {
    /// The batch id.
    pub batch_id: BatchId,
    /// City shared by every member.
    pub city: String,
    /// Country shared by every member.
    pub country: String,
    /// Member themes, in creation order.
    pub themes: Vec<String>,
    /// Convenience count of `themes`.
    pub total_themes: usize,
    /// Creation timestamp of the first member.
    pub created_at: DateTime<Utc>,
    /// Full member views.
    pub jobs: Vec<JobView>,
}

impl BatchView {
    /// Count of member jobs in the given state.
    pub fn count_in(&self, status: JobStatus) -> usize {
        self.jobs.iter().filter(|job| job.status == status).count()
    }

    /// True once every member job is terminal.
    pub fn is_settled(&self) -> bool {
        self.jobs.iter().all(|job| job.status.is_terminal())
    }
}
