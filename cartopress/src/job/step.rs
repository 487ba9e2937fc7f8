//! Progress step records.
//!
//! Each call to the progress tracker can append one immutable step record to
//! the job's progress log. The step status is an explicit field chosen by the
//! caller - it is never inferred from the step text.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Completion state of a single recorded step.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// Step announced but not yet underway.
    #[default]
    Pending,

    /// Step currently running.
    InProgress,

    /// Step finished.
    Completed,
}

/// One entry in a job's progress log.
///
/// Steps are appended, never mutated or removed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProgressStep {
    /// Human-readable step description.
    pub text: String,

    /// Explicit completion state of the step.
    pub status: StepStatus,

    /// Overall job progress (0-100) at the time the step was recorded.
    pub progress: u8,

    /// When the step was recorded.
    pub timestamp: DateTime<Utc>,
}

impl ProgressStep {
    /// Creates a step record stamped with the current time.
    pub fn now(text: impl Into<String>, status: StepStatus, progress: u8) -> Self {
        Self {
            text: text.into(),
            status,
            progress,
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_records_fields() {
        let step = ProgressStep::now("Streets downloaded ✓", StepStatus::Completed, 40);
        assert_eq!(step.text, "Streets downloaded ✓");
        assert_eq!(step.status, StepStatus::Completed);
        assert_eq!(step.progress, 40);
    }

    #[test]
    fn test_step_status_serde_names() {
        let json = serde_json::to_string(&StepStatus::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");
    }
}
