//! Job lifecycle status.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Processing state of a generation job.
///
/// Jobs move `Pending → Processing → {Completed, Failed, Cancelled}`.
/// Cancellation is only reachable from the non-terminal states; Completed and
/// Failed jobs stay where they are.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Created, waiting to be picked up by an orchestrator.
    #[default]
    Pending,

    /// An orchestrator owns the job and is driving the pipeline.
    Processing,

    /// Pipeline finished; a poster record exists for this job.
    Completed,

    /// Pipeline aborted; error details are recorded on the job.
    Failed,

    /// Explicitly cancelled before reaching a terminal outcome.
    Cancelled,
}

impl JobStatus {
    /// Returns true if the job has reached a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// Returns true if a cancel request can still take effect.
    pub fn can_cancel(&self) -> bool {
        matches!(self, Self::Pending | Self::Processing)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Processing => write!(f, "processing"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(!JobStatus::Pending.is_terminal());
        assert!(!JobStatus::Processing.is_terminal());
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(JobStatus::Cancelled.is_terminal());
    }

    #[test]
    fn test_can_cancel() {
        assert!(JobStatus::Pending.can_cancel());
        assert!(JobStatus::Processing.can_cancel());
        assert!(!JobStatus::Completed.can_cancel());
        assert!(!JobStatus::Failed.can_cancel());
        assert!(!JobStatus::Cancelled.can_cancel());
    }

    #[test]
    fn test_display() {
        assert_eq!(JobStatus::Processing.to_string(), "processing");
        assert_eq!(JobStatus::Cancelled.to_string(), "cancelled");
    }
}
