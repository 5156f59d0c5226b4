//! Phase values shared by every reconciliation stage.
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ReconcileError;

/// Coarse outcome reported to the installation status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusPhase {
    Completed,
    #[serde(rename = "in progress")]
    InProgress,
    Failed,
}

impl StatusPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusPhase::Completed => "completed",
            StatusPhase::InProgress => "in progress",
            StatusPhase::Failed => "failed",
        }
    }
}

impl fmt::Display for StatusPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tagged result of a single stage.
///
/// ```
/// use sso_core::{StageOutcome, StatusPhase};
///
/// let waiting = StageOutcome::in_progress("namespace rhsso not ready");
/// assert_eq!(waiting.phase(), StatusPhase::InProgress);
/// assert!(!waiting.is_completed());
/// ```
#[derive(Debug)]
pub enum StageOutcome {
    Completed,
    InProgress(String),
    Failed(ReconcileError),
}

impl StageOutcome {
    pub fn in_progress(reason: impl Into<String>) -> Self {
        StageOutcome::InProgress(reason.into())
    }

    pub fn phase(&self) -> StatusPhase {
        match self {
            StageOutcome::Completed => StatusPhase::Completed,
            StageOutcome::InProgress(_) => StatusPhase::InProgress,
            StageOutcome::Failed(_) => StatusPhase::Failed,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, StageOutcome::Completed)
    }

    pub fn error(&self) -> Option<&ReconcileError> {
        match self {
            StageOutcome::Failed(err) => Some(err),
            _ => None,
        }
    }

    /// Converts a collaborator-reported phase into an outcome, using `reason`
    /// for anything that is not `Completed`.
    pub fn from_phase(phase: StatusPhase, reason: impl Into<String>) -> Self {
        match phase {
            StatusPhase::Completed => StageOutcome::Completed,
            StatusPhase::InProgress => StageOutcome::InProgress(reason.into()),
            StatusPhase::Failed => {
                StageOutcome::Failed(ReconcileError::Collaborator(anyhow::anyhow!(reason.into())))
            }
        }
    }
}

impl From<Result<StageOutcome, ReconcileError>> for StageOutcome {
    fn from(result: Result<StageOutcome, ReconcileError>) -> Self {
        result.unwrap_or_else(StageOutcome::Failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_results_flatten_into_outcome() {
        let result: Result<StageOutcome, ReconcileError> =
            Err(ReconcileError::Collaborator(anyhow::anyhow!("boom")));
        let outcome = StageOutcome::from(result);
        assert_eq!(outcome.phase(), StatusPhase::Failed);
        assert_eq!(outcome.error().map(ToString::to_string).as_deref(), Some("boom"));
    }

    #[test]
    fn phase_serializes_with_status_names() {
        let value = serde_json::to_value(StatusPhase::InProgress).unwrap();
        assert_eq!(value, serde_json::json!("in progress"));
        let parsed: StatusPhase = serde_json::from_value(serde_json::json!("completed")).unwrap();
        assert_eq!(parsed, StatusPhase::Completed);
    }
}
