//! Step and run status values.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Outcome of a single step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    /// Not run yet
    #[default]
    Pending,
    /// Exited with code 0
    Success,
    /// Exited non-zero or could not be started
    Error,
    /// Killed after exceeding the timeout
    Timeout,
    /// Skipped by the operator
    Skipped,
}

impl StepStatus {
    /// Machine-readable name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Success => "success",
            Self::Error => "error",
            Self::Timeout => "timeout",
            Self::Skipped => "skipped",
        }
    }

    /// Whether the step ended badly.
    pub fn is_failure(self) -> bool {
        matches!(self, Self::Error | Self::Timeout)
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Overall outcome of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    #[default]
    Completed,
    Failed,
    Interrupted,
}

impl RunStatus {
    /// Machine-readable name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Interrupted => "interrupted",
        }
    }

    /// Summarize a run from the status of each of its steps.
    ///
    /// Any failed step fails the run; otherwise a run with steps still
    /// pending is interrupted.
    pub fn summarize<I: IntoIterator<Item = StepStatus>>(statuses: I) -> Self {
        let mut pending = false;
        for status in statuses {
            if status.is_failure() {
                return Self::Failed;
            }
            pending |= status == StepStatus::Pending;
        }
        if pending {
            Self::Interrupted
        } else {
            Self::Completed
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
