//! Cartopress - job orchestration for city map poster generation.
//!
//! This library turns a (city, theme, format) request into a rendered poster
//! file via a multi-stage pipeline: geocode → fetch geographic data → render
//! → thumbnail → persist. The crate owns the job/batch state machines, the
//! progress-tracking protocol, and the concurrency discipline around a
//! non-reentrant renderer; the actual pixel rendering, OSM downloads, and
//! persistence backends are opaque capabilities injected behind traits.
//!
//! # High-Level API
//!
//! The [`service`] module provides the facade consumed by the API layer:
//!
//! ```ignore
//! use cartopress::service::{CreateJobRequest, PosterService};
//!
//! let service = PosterService::new(store, queue);
//! let ticket = service.create_job(request).await?;
//!
//! // Poll status
//! let view = service.job_status(&ticket.job_id)?;
//! ```
//!
//! # Architecture
//!
//! ```text
//! API layer → PosterService → TaskQueue → JobOrchestrator / BatchOrchestrator
//!                                              │
//!                      ┌───────────────────────┼──────────────────────┐
//!                      ▼                       ▼                      ▼
//!               FetchCoordinator        RenderSerializer       ProgressTracker
//!               (3 parallel tasks)      (global mutex)         (store writes)
//! ```

pub mod error;
pub mod fetch;
pub mod format;
pub mod geocode;
pub mod job;
pub mod logging;
pub mod orchestrator;
pub mod progress;
pub mod queue;
pub mod render;
pub mod service;
pub mod store;
pub mod theme;

/// Version of the cartopress library.
///
/// Defined in `Cargo.toml` and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
