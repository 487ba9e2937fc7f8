//! Shared collaborator set for the orchestration pipelines.

use crate::error::OrchestrationError;
use crate::fetch::{DataSource, FetchCoordinator, GeoPoint, MapBundle};
use crate::format::PageSpec;
use crate::geocode::GeocodeService;
use crate::job::{JobRecord, PosterId, PosterRecord, ProgressStep, StepStatus};
use crate::progress::{self, ProgressTracker};
use crate::render::{RenderRequest, RenderSerializer, RenderStage, Thumbnailer};
use crate::store::{JobStore, RetryingStore, StoreError};
use crate::theme::{Theme, ThemeStore};
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Everything a pipeline run needs, wired once at startup and shared by every
/// job and batch invocation.
pub struct OrchestratorContext {
    pub(crate) store: Arc<dyn JobStore>,
    pub(crate) lookup: RetryingStore,
    pub(crate) geocoder: GeocodeService,
    pub(crate) fetcher: FetchCoordinator,
    pub(crate) renderer: Arc<RenderSerializer>,
    pub(crate) tracker: ProgressTracker,
    pub(crate) themes: Arc<dyn ThemeStore>,
    pub(crate) thumbnailer: Arc<dyn Thumbnailer>,
    pub(crate) output_dir: PathBuf,
}

impl OrchestratorContext {
    /// Wires a context from its collaborators, creating the output directory
    /// up front so the pipelines never race on it.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<dyn JobStore>,
        lookup: RetryingStore,
        geocoder: GeocodeService,
        fetcher: FetchCoordinator,
        renderer: Arc<RenderSerializer>,
        themes: Arc<dyn ThemeStore>,
        thumbnailer: Arc<dyn Thumbnailer>,
        output_dir: PathBuf,
    ) -> std::io::Result<Self> {
        std::fs::create_dir_all(&output_dir)?;
        let tracker = ProgressTracker::new(Arc::clone(&store));
        Ok(Self {
            store,
            lookup,
            geocoder,
            fetcher,
            renderer,
            tracker,
            themes,
            thumbnailer,
            output_dir,
        })
    }

    /// The underlying job/poster store.
    pub fn store(&self) -> &Arc<dyn JobStore> {
        &self.store
    }

    /// Output path for a poster rendered at `stamp`.
    pub(crate) fn output_path(&self, city: &str, theme_id: &str, stamp: DateTime<Utc>) -> PathBuf {
        self.output_dir
            .join(output_filename(city, theme_id, stamp))
    }

    /// Renders one theme for `job` and commits the result.
    ///
    /// Runs the serialized render with per-stage progress, generates the
    /// thumbnail (non-fatal on failure), then atomically persists the poster
    /// row together with the Completed job state. Page geometry comes from
    /// `page`, which in batch mode is the representative job's, not
    /// necessarily this one's.
    ///
    /// Returns `Ok(None)` when the job record went terminal while the render
    /// was in flight (a cancel raced the render): the rendered file stays on
    /// disk, but no poster row is written and the record is left untouched.
    pub(crate) async fn render_and_commit(
        &self,
        job: &JobRecord,
        theme: &Theme,
        bundle: Arc<MapBundle>,
        page: &PageSpec,
        output_path: PathBuf,
    ) -> Result<Option<PosterId>, OrchestrationError> {
        let (width_inches, height_inches) = page.dimensions_inches()?;
        let (width_px, height_px) = page.pixel_dimensions()?;

        let request = RenderRequest {
            bundle,
            theme: theme.clone(),
            city: job.city.clone(),
            country: job.country.clone(),
            point: GeoPoint::new(job.latitude, job.longitude),
            output_path: output_path.clone(),
            width_inches,
            height_inches,
            dpi: page.dpi,
        };

        let job_id = job.id.clone();
        let file_size = self
            .renderer
            .render(&request, &|stage| {
                self.tracker.advance(
                    &job_id,
                    stage_step_text(stage),
                    StepStatus::InProgress,
                    progress::checkpoint_for_stage(stage),
                    true,
                );
            })
            .await?;

        self.tracker.advance(
            &job.id,
            "Generating thumbnail...",
            StepStatus::InProgress,
            progress::checkpoints::THUMBNAIL,
            true,
        );
        let thumbnail_path = match self.thumbnailer.generate(&output_path) {
            Ok(path) => Some(path),
            Err(err) => {
                warn!(job_id = %job.id, error = err, "thumbnail generation failed, poster ships without one");
                None
            }
        };

        let filename = output_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let poster = PosterRecord {
            id: PosterId::fresh(),
            job_id: job.id.clone(),
            city: job.city.clone(),
            country: job.country.clone(),
            theme: theme.id.clone(),
            distance: job.distance,
            latitude: job.latitude,
            longitude: job.longitude,
            filename,
            file_path: output_path,
            file_size,
            width_px,
            height_px,
            page: *page,
            thumbnail_path,
            session_id: job.session_id.clone(),
            created_at: Utc::now(),
            accessed_at: None,
            download_count: 0,
        };

        // Reload so the commit carries every progress step written since this
        // snapshot was taken.
        let mut fresh = self
            .store
            .get_job(&job.id)?
            .ok_or_else(|| StoreError::Unavailable("job vanished before completion".to_string()))?;
        if fresh.status.is_terminal() {
            info!(
                job_id = %job.id,
                status = %fresh.status,
                "job went terminal during render, skipping poster commit"
            );
            return Ok(None);
        }
        fresh.current_step = Some("Poster ready ✓".to_string());
        fresh
            .progress_steps
            .push(ProgressStep::now("Poster ready ✓", StepStatus::Completed, 100));
        fresh.mark_completed(poster.id.clone());
        self.store.complete_with_poster(&fresh, &poster)?;

        info!(
            job_id = %job.id,
            poster_id = %poster.id,
            theme = %theme.id,
            size_bytes = file_size,
            "poster committed"
        );
        Ok(Some(poster.id))
    }

    /// Writes a hard failure onto the job record.
    ///
    /// Failures here are themselves swallowed: the error is already being
    /// reported through logs, and there is nothing left to abort.
    pub(crate) fn record_failure(&self, job: &JobRecord, err: &OrchestrationError) {
        let mut fresh = match self.store.get_job(&job.id) {
            Ok(Some(fresh)) => fresh,
            _ => job.clone(),
        };
        fresh.mark_failed(err.kind(), err.to_string(), err.trace());
        if let Err(save_err) = self.store.save_job(&fresh) {
            warn!(job_id = %job.id, error = %save_err, "failed to record job failure");
        }
    }
}

/// Poster filename: `{city_slug}_{theme}_{YYYYMMDD_HHMMSS}.png`.
pub(crate) fn output_filename(city: &str, theme_id: &str, stamp: DateTime<Utc>) -> String {
    format!(
        "{}_{}_{}.png",
        city_slug(city),
        theme_id,
        stamp.format("%Y%m%d_%H%M%S")
    )
}

/// Lowercase, filesystem-safe rendition of a city name.
pub(crate) fn city_slug(city: &str) -> String {
    let mut slug = String::with_capacity(city.len());
    let mut last_was_sep = true;
    for ch in city.chars() {
        if ch.is_alphanumeric() {
            slug.extend(ch.to_lowercase());
            last_was_sep = false;
        } else if !last_was_sep {
            slug.push('_');
            last_was_sep = true;
        }
    }
    if slug.ends_with('_') {
        slug.pop();
    }
    if slug.is_empty() {
        // Degenerate names still need a unique, valid filename.
        slug = format!("poster_{}", Uuid::new_v4().simple());
    }
    slug
}

/// Step text recorded when a fetch source completes.
pub(crate) fn source_step_text(source: DataSource) -> &'static str {
    match source {
        DataSource::Streets => "Street network downloaded ✓",
        DataSource::Water => "Water features downloaded ✓",
        DataSource::Parks => "Parks downloaded ✓",
    }
}

/// Step text recorded as each render stage begins.
pub(crate) fn stage_step_text(stage: RenderStage) -> &'static str {
    match stage {
        RenderStage::Initializing => "Initializing render...",
        RenderStage::PlottingFeatures => "Plotting water and parks...",
        RenderStage::PlottingRoads => "Plotting street network...",
        RenderStage::AddingGradients => "Adding gradient fades...",
        RenderStage::AddingTypography => "Adding typography...",
        RenderStage::Saving => "Saving poster...",
    }
}
