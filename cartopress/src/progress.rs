//! Job progress tracking.
//!
//! Each advance is an independent read-modify-write against the store - no
//! in-memory job state is assumed to survive between calls, because progress
//! writers and status readers can live in different processes. Progress
//! reporting must never abort the pipeline: every failure here is logged and
//! swallowed.

use crate::fetch::DataSource;
use crate::job::{JobId, ProgressStep, StepStatus};
use crate::render::RenderStage;
use crate::store::JobStore;
use std::sync::Arc;
use tracing::{info, warn};

/// Fixed checkpoint percentages for the pipeline milestones.
pub mod checkpoints {
    /// Initial "Location found" step.
    pub const LOCATION_FOUND: u8 = 5;
    /// Coordinates available.
    pub const COORDINATES: u8 = 10;
    /// Theme configuration loaded.
    pub const THEME_LOADED: u8 = 20;
    /// Output path prepared.
    pub const OUTPUT_PREPARED: u8 = 25;
    /// Data fetch started.
    pub const FETCH_STARTED: u8 = 30;
    /// Street network downloaded.
    pub const STREETS_DONE: u8 = 40;
    /// Water features downloaded.
    pub const WATER_DONE: u8 = 50;
    /// Parks downloaded.
    pub const PARKS_DONE: u8 = 60;
    /// Render initializing.
    pub const RENDER_INITIALIZING: u8 = 65;
    /// Plotting water and park features.
    pub const RENDER_FEATURES: u8 = 70;
    /// Plotting the street network.
    pub const RENDER_ROADS: u8 = 75;
    /// Adding gradient fades.
    pub const RENDER_GRADIENTS: u8 = 80;
    /// Adding typography.
    pub const RENDER_TYPOGRAPHY: u8 = 85;
    /// Saving the output file.
    pub const RENDER_SAVING: u8 = 90;
    /// Generating the thumbnail.
    pub const THUMBNAIL: u8 = 95;
    /// Pipeline finished.
    pub const COMPLETE: u8 = 100;
}

/// Checkpoint reached when a fetch source completes.
pub fn checkpoint_for_source(source: DataSource) -> u8 {
    match source {
        DataSource::Streets => checkpoints::STREETS_DONE,
        DataSource::Water => checkpoints::WATER_DONE,
        DataSource::Parks => checkpoints::PARKS_DONE,
    }
}

/// Checkpoint reached when the renderer enters a stage.
pub fn checkpoint_for_stage(stage: RenderStage) -> u8 {
    match stage {
        RenderStage::Initializing => checkpoints::RENDER_INITIALIZING,
        RenderStage::PlottingFeatures => checkpoints::RENDER_FEATURES,
        RenderStage::PlottingRoads => checkpoints::RENDER_ROADS,
        RenderStage::AddingGradients => checkpoints::RENDER_GRADIENTS,
        RenderStage::AddingTypography => checkpoints::RENDER_TYPOGRAPHY,
        RenderStage::Saving => checkpoints::RENDER_SAVING,
    }
}

/// Appends step records and keeps a job's percent-complete current.
pub struct ProgressTracker {
    store: Arc<dyn JobStore>,
}

impl ProgressTracker {
    /// Creates a tracker over the given store.
    pub fn new(store: Arc<dyn JobStore>) -> Self {
        Self { store }
    }

    /// Records a progress update for `job_id`.
    ///
    /// Sets the current step text and the percent-complete, and - when
    /// `record_step` is true - appends an immutable step record. The scalar
    /// progress is clamped to its running maximum so a job's percentage never
    /// moves backwards (fetch sources can complete out of submission order);
    /// the step record itself keeps the caller's percentage verbatim.
    pub fn advance(
        &self,
        job_id: &JobId,
        text: &str,
        status: StepStatus,
        percent: u8,
        record_step: bool,
    ) {
        let mut job = match self.store.get_job(job_id) {
            Ok(Some(job)) => job,
            Ok(None) => {
                warn!(%job_id, "progress update for unknown job, skipping");
                return;
            }
            Err(err) => {
                warn!(%job_id, error = %err, "failed to load job for progress update");
                return;
            }
        };

        job.current_step = Some(text.to_string());
        job.progress = job.progress.max(percent);
        if record_step {
            job.progress_steps
                .push(ProgressStep::now(text, status, percent));
        }

        if let Err(err) = self.store.save_job(&job) {
            warn!(%job_id, error = %err, "failed to persist progress update");
            return;
        }

        info!(%job_id, progress = job.progress, step = text, "job progress");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::PageSpec;
    use crate::job::JobRecord;
    use crate::store::MemoryStore;

    fn setup() -> (Arc<MemoryStore>, ProgressTracker, JobId) {
        let store = Arc::new(MemoryStore::new());
        let mut job = JobRecord::new(
            "Berlin",
            "Germany",
            "noir",
            20_000,
            52.52,
            13.405,
            false,
            PageSpec::default(),
            None,
        );
        job.mark_processing();
        store.save_job(&job).unwrap();
        let tracker = ProgressTracker::new(store.clone());
        (store, tracker, job.id)
    }

    #[test]
    fn test_advance_updates_job_and_records_step() {
        let (store, tracker, job_id) = setup();

        tracker.advance(
            &job_id,
            "Streets downloaded ✓",
            StepStatus::Completed,
            checkpoints::STREETS_DONE,
            true,
        );

        let job = store.get_job(&job_id).unwrap().unwrap();
        assert_eq!(job.progress, 40);
        assert_eq!(job.current_step.as_deref(), Some("Streets downloaded ✓"));
        assert_eq!(job.progress_steps.len(), 1);
        assert_eq!(job.progress_steps[0].status, StepStatus::Completed);
    }

    #[test]
    fn test_advance_without_recording_step() {
        let (store, tracker, job_id) = setup();

        tracker.advance(&job_id, "quiet update", StepStatus::InProgress, 10, false);

        let job = store.get_job(&job_id).unwrap().unwrap();
        assert_eq!(job.progress, 10);
        assert!(job.progress_steps.is_empty());
    }

    #[test]
    fn test_progress_never_decreases() {
        let (store, tracker, job_id) = setup();

        // Parks can land before streets; the scalar must not move backwards.
        tracker.advance(&job_id, "Parks downloaded ✓", StepStatus::Completed, 60, true);
        tracker.advance(&job_id, "Streets downloaded ✓", StepStatus::Completed, 40, true);

        let job = store.get_job(&job_id).unwrap().unwrap();
        assert_eq!(job.progress, 60);
        // The step log still carries the caller's percentages verbatim.
        assert_eq!(job.progress_steps[1].progress, 40);
    }

    #[test]
    fn test_unknown_job_is_swallowed() {
        let (_, tracker, _) = setup();
        // Must not panic or error.
        tracker.advance(&JobId::new("ghost"), "step", StepStatus::Pending, 5, true);
    }
}
