//! The poster record - metadata for one rendered artifact.

use super::{JobId, PosterId};
use crate::format::PageSpec;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One successfully rendered poster, 1:1 with a completed job.
///
/// Created by the orchestrator on the success path only, after the render
/// step has verified the output file exists on disk, inside the same
/// transaction that marks the job Completed.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PosterRecord {
    /// Unique identifier.
    pub id: PosterId,

    /// The job that produced this poster.
    pub job_id: JobId,

    /// City name, copied from the originating job.
    pub city: String,

    /// Country name, copied from the originating job.
    pub country: String,

    /// Theme the poster was rendered with.
    pub theme: String,

    /// Map radius in meters, copied from the job.
    pub distance: u32,

    /// Centre latitude.
    pub latitude: f64,

    /// Centre longitude.
    pub longitude: f64,

    /// Output filename (basename only).
    pub filename: String,

    /// Absolute path of the rendered file.
    pub file_path: PathBuf,

    /// Size of the rendered file in bytes.
    pub file_size: u64,

    /// Rendered width in pixels.
    pub width_px: u32,

    /// Rendered height in pixels.
    pub height_px: u32,

    /// Page geometry, copied from the job.
    pub page: PageSpec,

    /// Thumbnail path, absent when thumbnail generation failed.
    pub thumbnail_path: Option<PathBuf>,

    /// Session that created the originating request.
    pub session_id: Option<String>,

    /// When the poster record was created.
    pub created_at: DateTime<Utc>,

    /// Last time the poster was served, if ever.
    pub accessed_at: Option<DateTime<Utc>>,

    /// Number of times the poster has been downloaded.
    pub download_count: u64,
}

impl PosterRecord {
    /// Stamps an access, updating `accessed_at`.
    pub fn touch(&mut self) {
        self.accessed_at = Some(Utc::now());
    }

    /// Records one download.
    pub fn record_download(&mut self) {
        self.download_count += 1;
    }
}
