//! Single-job pipeline.

use super::context::{self, OrchestratorContext};
use crate::error::OrchestrationError;
use crate::fetch::GeoPoint;
use crate::job::{JobId, JobRecord, PosterId, StepStatus};
use crate::progress::{self, checkpoints};
use crate::store::StoreError;
use chrono::Utc;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Outcome of a pipeline section: keep going, or stop for one of two reasons
/// that must not be conflated - a hard failure lands on the record, a
/// cancellation does not.
enum Halt {
    Cancelled,
    Error(OrchestrationError),
}

impl From<OrchestrationError> for Halt {
    fn from(err: OrchestrationError) -> Self {
        Self::Error(err)
    }
}

/// Drives one job through the geocode → fetch → render → persist pipeline.
pub struct JobOrchestrator {
    ctx: Arc<OrchestratorContext>,
}

impl JobOrchestrator {
    /// Creates an orchestrator over the shared context.
    pub fn new(ctx: Arc<OrchestratorContext>) -> Self {
        Self { ctx }
    }

    /// Runs the full pipeline for `job_id`.
    ///
    /// Every exit path is handled internally: hard failures are written onto
    /// the job record, cancellation marks it Cancelled, and a job that never
    /// becomes visible in the store is logged and abandoned without touching
    /// any record.
    pub async fn run(&self, job_id: &JobId, cancel: &CancellationToken) {
        let job = match self.ctx.lookup.get_job_with_retry(job_id).await {
            Ok(job) => job,
            Err(err) => {
                error!(%job_id, error = %err, "abandoning task, job never became visible");
                return;
            }
        };

        if job.status.is_terminal() {
            info!(%job_id, status = %job.status, "job already terminal, nothing to do");
            return;
        }
        if cancel.is_cancelled() {
            self.finish_cancelled(&job);
            return;
        }

        let mut job = job;
        job.mark_processing();
        if let Err(err) = self.ctx.store.save_job(&job) {
            error!(%job_id, error = %err, "could not persist Processing transition");
            return;
        }
        self.ctx.tracker.advance(
            job_id,
            "Location found ✓",
            StepStatus::Completed,
            checkpoints::LOCATION_FOUND,
            true,
        );

        match self.execute(&mut job, cancel).await {
            Ok(poster_id) => {
                info!(%job_id, %poster_id, "job completed");
            }
            Err(Halt::Cancelled) => {
                self.finish_cancelled(&job);
            }
            Err(Halt::Error(err)) => {
                error!(%job_id, kind = err.kind(), error = %err, "job failed");
                self.ctx.record_failure(&job, &err);
            }
        }
    }

    /// The Processing-state driving sequence.
    async fn execute(
        &self,
        job: &mut JobRecord,
        cancel: &CancellationToken,
    ) -> Result<PosterId, Halt> {
        let ctx = &self.ctx;

        // Coordinates are usually resolved upstream at job creation; geocode
        // only when they are absent.
        if job.latitude == 0.0 && job.longitude == 0.0 {
            let resolved = ctx
                .geocoder
                .geocode(&job.city, &job.country)
                .await
                .map_err(OrchestrationError::from)?;
            job.latitude = resolved.latitude;
            job.longitude = resolved.longitude;
            let mut fresh = self.reload(job)?;
            fresh.latitude = resolved.latitude;
            fresh.longitude = resolved.longitude;
            ctx.store
                .save_job(&fresh)
                .map_err(OrchestrationError::from)?;
        }
        ctx.tracker.advance(
            &job.id,
            "Coordinates available ✓",
            StepStatus::Completed,
            checkpoints::COORDINATES,
            true,
        );

        if cancel.is_cancelled() {
            return Err(Halt::Cancelled);
        }

        let theme = ctx
            .themes
            .load(&job.theme)
            .map_err(OrchestrationError::from)?;
        ctx.tracker.advance(
            &job.id,
            "Theme loaded ✓",
            StepStatus::Completed,
            checkpoints::THEME_LOADED,
            true,
        );

        let output_path = ctx.output_path(&job.city, &theme.id, Utc::now());
        ctx.tracker.advance(
            &job.id,
            "Output path prepared ✓",
            StepStatus::Completed,
            checkpoints::OUTPUT_PREPARED,
            true,
        );

        if cancel.is_cancelled() {
            return Err(Halt::Cancelled);
        }

        ctx.tracker.advance(
            &job.id,
            "Downloading map data (3 sources)...",
            StepStatus::InProgress,
            checkpoints::FETCH_STARTED,
            true,
        );
        let point = GeoPoint::new(job.latitude, job.longitude);
        let job_id = job.id.clone();
        let bundle = ctx
            .fetcher
            .fetch_all(point, job.distance, &|source, _completed, _total| {
                ctx.tracker.advance(
                    &job_id,
                    context::source_step_text(source),
                    StepStatus::Completed,
                    progress::checkpoint_for_source(source),
                    true,
                );
            })
            .await
            .map_err(OrchestrationError::from)?;

        // A render, once started, always runs to completion; cancellation is
        // only honoured up to this point.
        if cancel.is_cancelled() {
            return Err(Halt::Cancelled);
        }

        let page = job.page;
        match ctx
            .render_and_commit(job, &theme, Arc::new(bundle), &page, output_path)
            .await?
        {
            Some(poster_id) => Ok(poster_id),
            // The record was cancelled while the render ran to completion.
            None => Err(Halt::Cancelled),
        }
    }

    fn reload(&self, job: &JobRecord) -> Result<JobRecord, OrchestrationError> {
        self.ctx
            .store
            .get_job(&job.id)?
            .ok_or_else(|| {
                OrchestrationError::Store(StoreError::Unavailable(
                    "job disappeared mid-pipeline".to_string(),
                ))
            })
    }

    /// Ensures a cancelled run leaves the record Cancelled even when the
    /// cancel request raced the record update.
    fn finish_cancelled(&self, job: &JobRecord) {
        info!(job_id = %job.id, "job cancelled");
        match self.ctx.store.get_job(&job.id) {
            Ok(Some(mut fresh)) if !fresh.status.is_terminal() => {
                fresh.mark_cancelled();
                if let Err(err) = self.ctx.store.save_job(&fresh) {
                    warn!(job_id = %job.id, error = %err, "failed to persist Cancelled state");
                }
            }
            Ok(_) => {}
            Err(err) => {
                warn!(job_id = %job.id, error = %err, "failed to load job for cancellation");
            }
        }
    }
}
