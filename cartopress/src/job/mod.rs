//! Job and poster entity model.
//!
//! A [`JobRecord`] is one poster-generation request together with its mutable
//! processing state; a [`PosterRecord`] is the artifact produced by a
//! successfully completed job, 1:1 with it. A "batch" is not a stored entity:
//! it is the set of jobs sharing a [`BatchId`], and its status is always
//! derived by scanning the members.
//!
//! Records are owned by exactly one orchestrator while processing; everything
//! else reads them through the store.

mod id;
mod poster;
mod record;
mod status;
mod step;

pub use id::{BatchId, JobId, PosterId};
pub use poster::PosterRecord;
pub use record::{JobErrorInfo, JobOutcome, JobRecord};
pub use status::JobStatus;
pub use step::{ProgressStep, StepStatus};
