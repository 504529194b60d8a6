//! Workflow state machine.
//!
//! `NotStarted -> Vision -> Restoration -> Historical -> Environmental ->
//! Completed`, with `Failed(stage)` reachable from any fatal stage.

use crate::core::{StageId, StageStatus, WorkflowStatus};
use std::fmt;

/// Where a workflow run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WorkflowState {
    /// Nothing has run.
    #[default]
    NotStarted,
    /// `StageId` is the next stage to run.
    Running(StageId),
    /// Every stage ran.
    Completed,
    /// A fatal stage failed.
    Failed(StageId),
}

impl WorkflowState {
    /// Enters the first stage. Any other state is returned unchanged.
    #[must_use]
    pub const fn begin(self) -> Self {
        match self {
            Self::NotStarted => Self::Running(StageId::Vision),
            other => other,
        }
    }

    /// Applies the outcome of the running stage.
    ///
    /// An error from a fatal stage moves to `Failed`; anything else moves to
    /// the next stage or to `Completed`. Non-running states are returned
    /// unchanged.
    #[must_use]
    pub fn after(self, status: StageStatus) -> Self {
        match self {
            Self::Running(stage) if status == StageStatus::Error && stage.is_fatal() => {
                Self::Failed(stage)
            }
            Self::Running(stage) => stage.next().map_or(Self::Completed, Self::Running),
            other => other,
        }
    }

    /// The stage to run next, if the run is in progress.
    #[must_use]
    pub const fn current_stage(self) -> Option<StageId> {
        match self {
            Self::Running(stage) => Some(stage),
            _ => None,
        }
    }

    /// Returns true for `Completed` and `Failed`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed(_))
    }

    /// The workflow status of a terminal state.
    #[must_use]
    pub const fn terminal_status(self) -> Option<WorkflowStatus> {
        match self {
            Self::Completed => Some(WorkflowStatus::Completed),
            Self::Failed(stage) => Some(WorkflowStatus::FailedAt(stage)),
            Self::NotStarted | Self::Running(_) => None,
        }
    }
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotStarted => write!(f, "not_started"),
            Self::Running(stage) => write!(f, "{stage}"),
            Self::Completed => write!(f, "completed"),
            Self::Failed(stage) => write!(f, "failed_at_{stage}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_to_end(statuses: &[StageStatus]) -> (WorkflowState, Vec<StageId>) {
        let mut state = WorkflowState::NotStarted.begin();
        let mut visited = Vec::new();
        let mut outcomes = statuses.iter();
        while let Some(stage) = state.current_stage() {
            visited.push(stage);
            let status = outcomes.next().copied().unwrap_or(StageStatus::Success);
            state = state.after(status);
        }
        (state, visited)
    }

    #[test]
    fn test_all_success_completes() {
        let (state, visited) = run_to_end(&[]);
        assert_eq!(state, WorkflowState::Completed);
        assert_eq!(visited, StageId::ORDER.to_vec());
        assert_eq!(state.terminal_status(), Some(WorkflowStatus::Completed));
    }

    #[test]
    fn test_vision_failure_is_absorbing() {
        let (state, visited) = run_to_end(&[StageStatus::Error]);
        assert_eq!(state, WorkflowState::Failed(StageId::Vision));
        assert_eq!(visited, vec![StageId::Vision]);
        assert_eq!(state.after(StageStatus::Success), state);
        assert_eq!(state.begin(), state);
    }

    #[test]
    fn test_restoration_failure_continues() {
        let (state, visited) = run_to_end(&[StageStatus::Success, StageStatus::Error]);
        assert_eq!(state, WorkflowState::Completed);
        assert_eq!(visited.len(), 4);
    }

    #[test]
    fn test_environmental_failure_is_fatal() {
        let (state, _) = run_to_end(&[
            StageStatus::Success,
            StageStatus::Success,
            StageStatus::Success,
            StageStatus::Error,
        ]);
        assert_eq!(
            state.terminal_status(),
            Some(WorkflowStatus::FailedAt(StageId::Environmental))
        );
        assert_eq!(state.to_string(), "failed_at_environmental");
    }

    #[test]
    fn test_not_started_is_not_terminal() {
        assert!(!WorkflowState::NotStarted.is_terminal());
        assert_eq!(WorkflowState::NotStarted.current_stage(), None);
        assert_eq!(WorkflowState::NotStarted.after(StageStatus::Error), WorkflowState::NotStarted);
    }
}
