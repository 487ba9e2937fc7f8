//! Multi-theme batch pipeline.
//!
//! A batch shares one data fetch across N themes of the same location, then
//! renders the themes strictly one at a time. Each theme's result is applied
//! to its own job the moment it is known: partial completion is a normal
//! outcome, and one theme failing never touches its siblings.

use super::context::{self, OrchestratorContext};
use crate::error::OrchestrationError;
use crate::fetch::GeoPoint;
use crate::job::{BatchId, JobId, JobRecord, StepStatus};
use crate::progress::{self, checkpoints};
use chrono::Utc;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Drives a batch of jobs sharing one location through the pipeline.
pub struct BatchOrchestrator {
    ctx: Arc<OrchestratorContext>,
}

impl BatchOrchestrator {
    /// Creates an orchestrator over the shared context.
    pub fn new(ctx: Arc<OrchestratorContext>) -> Self {
        Self { ctx }
    }

    /// Runs the shared-fetch pipeline for the batch members.
    ///
    /// Member ids that never become visible are logged and dropped; if none
    /// resolve, the batch fails immediately with no further work. Coordinates
    /// and page geometry are taken from the first resolved job and applied
    /// uniformly.
    pub async fn run(&self, batch_id: &BatchId, job_ids: &[JobId], cancel: &CancellationToken) {
        let ctx = &self.ctx;

        let mut jobs = Vec::with_capacity(job_ids.len());
        for job_id in job_ids {
            match ctx.lookup.get_job_with_retry(job_id).await {
                Ok(job) if job.status.is_terminal() => {
                    info!(%batch_id, %job_id, status = %job.status, "skipping terminal batch member");
                }
                Ok(job) => jobs.push(job),
                Err(err) => {
                    error!(%batch_id, %job_id, error = %err, "dropping unresolvable batch member");
                }
            }
        }
        if jobs.is_empty() {
            let err = OrchestrationError::NoJobsFound(batch_id.to_string());
            error!(%batch_id, error = %err, "batch aborted");
            return;
        }

        info!(%batch_id, members = jobs.len(), "batch started");

        // All members go Processing together before any work begins.
        for job in &mut jobs {
            job.mark_processing();
            if let Err(err) = ctx.store.save_job(job) {
                warn!(%batch_id, job_id = %job.id, error = %err, "could not persist Processing transition");
            }
        }
        self.fan_out(&jobs, "Location found ✓", StepStatus::Completed, checkpoints::LOCATION_FOUND);
        self.fan_out(
            &jobs,
            "Coordinates available ✓",
            StepStatus::Completed,
            checkpoints::COORDINATES,
        );

        if cancel.is_cancelled() {
            self.cancel_remaining(&jobs);
            return;
        }

        // One fetch for the shared location; every member sees the same
        // checkpoints since the downloads are shared.
        let representative = &jobs[0];
        let point = GeoPoint::new(representative.latitude, representative.longitude);
        let page = representative.page;

        self.fan_out(
            &jobs,
            "Downloading map data (3 sources)...",
            StepStatus::InProgress,
            checkpoints::FETCH_STARTED,
        );
        let member_ids: Vec<JobId> = jobs.iter().map(|job| job.id.clone()).collect();
        let bundle = match ctx
            .fetcher
            .fetch_all(point, representative.distance, &|source, _completed, _total| {
                for job_id in &member_ids {
                    ctx.tracker.advance(
                        job_id,
                        context::source_step_text(source),
                        StepStatus::Completed,
                        progress::checkpoint_for_source(source),
                        true,
                    );
                }
            })
            .await
        {
            Ok(bundle) => Arc::new(bundle),
            Err(err) => {
                // The fetch is shared, so its failure is every member's
                // failure.
                let err = OrchestrationError::from(err);
                error!(%batch_id, kind = err.kind(), error = %err, "shared fetch failed, failing all members");
                for job in &jobs {
                    ctx.record_failure(job, &err);
                }
                return;
            }
        };

        // Themes render strictly one at a time. The render serializer would
        // force that anyway; submitting sequentially keeps failure isolation
        // simple.
        let stamp = Utc::now();
        let mut completed = 0usize;
        for job in &jobs {
            if cancel.is_cancelled() {
                self.cancel_remaining(&jobs[completed..]);
                break;
            }
            match self.render_member(job, Arc::clone(&bundle), &page, stamp).await {
                Ok(()) => completed += 1,
                Err(err) => {
                    completed += 1;
                    error!(
                        %batch_id,
                        job_id = %job.id,
                        theme = %job.theme,
                        kind = err.kind(),
                        error = %err,
                        "batch member failed, continuing with remaining themes"
                    );
                    ctx.record_failure(job, &err);
                }
            }
        }

        info!(%batch_id, "batch finished");
    }

    /// Renders one member's theme and commits its poster.
    async fn render_member(
        &self,
        job: &JobRecord,
        bundle: Arc<crate::fetch::MapBundle>,
        page: &crate::format::PageSpec,
        stamp: chrono::DateTime<Utc>,
    ) -> Result<(), OrchestrationError> {
        let ctx = &self.ctx;
        let theme = ctx.themes.load(&job.theme)?;
        ctx.tracker.advance(
            &job.id,
            "Theme loaded ✓",
            StepStatus::Completed,
            checkpoints::THEME_LOADED,
            true,
        );
        // Shared batch timestamp: members differ in theme only, so filenames
        // stay distinct while clearly belonging together.
        let output_path = ctx.output_path(&job.city, &theme.id, stamp);
        ctx.tracker.advance(
            &job.id,
            "Output path prepared ✓",
            StepStatus::Completed,
            checkpoints::OUTPUT_PREPARED,
            true,
        );

        match ctx
            .render_and_commit(job, &theme, bundle, page, output_path)
            .await?
        {
            Some(poster_id) => {
                info!(job_id = %job.id, %poster_id, theme = %theme.id, "batch member completed");
            }
            None => {
                info!(job_id = %job.id, theme = %theme.id, "batch member went terminal during render, commit skipped");
            }
        }
        Ok(())
    }

    fn fan_out(&self, jobs: &[JobRecord], text: &str, status: StepStatus, percent: u8) {
        for job in jobs {
            self.ctx.tracker.advance(&job.id, text, status, percent, true);
        }
    }

    /// Marks still-running members Cancelled after a batch-level cancel.
    fn cancel_remaining(&self, jobs: &[JobRecord]) {
        for job in jobs {
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
}
