//! Crate-level error taxonomy.
//!
//! Subsystems have their own error enums; [`OrchestrationError`] is the
//! umbrella the pipelines classify failures with before writing them onto the
//! job record. Soft failures (missing optional features, thumbnail errors,
//! cache unavailability, progress-update failures) never become an
//! `OrchestrationError` - they are logged and absorbed at the call site.

use crate::fetch::FetchError;
use crate::format::FormatError;
use crate::geocode::GeocodeError;
use crate::render::RenderError;
use crate::store::StoreError;
use crate::theme::ThemeError;
use thiserror::Error;

/// A hard failure that aborts the current job (or the current theme, in batch
/// mode) and is recorded on the job before the orchestrator returns.
#[derive(Debug, Error)]
pub enum OrchestrationError {
    /// Theme lookup failed.
    #[error(transparent)]
    Theme(#[from] ThemeError),

    /// Page geometry could not be resolved.
    #[error(transparent)]
    Format(#[from] FormatError),

    /// Geocoding failed (miss, quota, or upstream trouble).
    #[error(transparent)]
    Geocode(#[from] GeocodeError),

    /// The mandatory street-network download failed.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Rendering failed, including post-render output verification.
    #[error(transparent)]
    Render(#[from] RenderError),

    /// The job/poster store rejected a write.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Hand-off to the async task runtime failed before processing began.
    #[error("failed to queue task: {0}")]
    Queue(String),

    /// A job was not visible in the store after all lookup retries.
    #[error("job {job_id} not found after {attempts} attempts")]
    LookupExhausted {
        /// The id that never became visible.
        job_id: String,
        /// Attempts made before giving up.
        attempts: u32,
    },

    /// A batch resolved zero of its member jobs.
    #[error("no jobs found for batch {0}")]
    NoJobsFound(String),
}

impl OrchestrationError {
    /// Machine-readable classification written to failed job records.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Theme(_) => "NotFound",
            Self::Format(_) => "ValidationError",
            Self::Geocode(GeocodeError::NotFound { .. }) => "NotFound",
            Self::Geocode(GeocodeError::RateLimited) => "RateLimited",
            Self::Geocode(GeocodeError::Upstream(_)) => "UpstreamError",
            Self::Fetch(_) => "FetchFailed",
            Self::Render(RenderError::VerificationFailed { .. }) => "RenderVerificationFailed",
            Self::Render(_) => "RenderError",
            Self::Store(_) => "StoreError",
            Self::Queue(_) => "QueueError",
            Self::LookupExhausted { .. } => "LookupExhausted",
            Self::NoJobsFound(_) => "NoJobsFound",
        }
    }

    /// Full error chain, outermost first, for the job's trace field.
    pub fn trace(&self) -> String {
        let mut out = format!("{}: {}", self.kind(), self);
        let mut source = std::error::Error::source(self);
        while let Some(cause) = source {
            out.push_str(&format!("\n  caused by: {}", cause));
            source = cause.source();
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        let err = OrchestrationError::Queue("worker gone".to_string());
        assert_eq!(err.kind(), "QueueError");

        let err = OrchestrationError::LookupExhausted {
            job_id: "j1".to_string(),
            attempts: 5,
        };
        assert_eq!(err.kind(), "LookupExhausted");

        let err = OrchestrationError::Geocode(GeocodeError::RateLimited);
        assert_eq!(err.kind(), "RateLimited");
    }

    #[test]
    fn test_trace_contains_kind_and_message() {
        let err = OrchestrationError::NoJobsFound("b1".to_string());
        let trace = err.trace();
        assert!(trace.starts_with("NoJobsFound:"));
        assert!(trace.contains("b1"));
    }
}
