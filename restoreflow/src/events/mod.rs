//! Workflow lifecycle events.
//!
//! The orchestrator emits one event per lifecycle transition to the sink it
//! was built with. There is no process-wide sink.

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};

use crate::core::{FailureKind, StageId};
use serde_json::json;
use uuid::Uuid;

/// A lifecycle transition of one workflow run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowEvent {
    /// A run began.
    WorkflowStarted {
        /// Run id.
        run_id: Uuid,
        /// Uploaded image.
        image_path: String,
        /// Requested restoration level.
        restoration_level: String,
        /// Prediction span.
        time_span_years: u32,
    },
    /// A stage began.
    StageStarted {
        /// Run id.
        run_id: Uuid,
        /// Stage.
        stage: StageId,
    },
    /// A stage succeeded.
    StageCompleted {
        /// Run id.
        run_id: Uuid,
        /// Stage.
        stage: StageId,
        /// Stage wall time.
        duration_ms: i64,
    },
    /// A stage returned an error result.
    StageFailed {
        /// Run id.
        run_id: Uuid,
        /// Stage.
        stage: StageId,
        /// Failure category.
        kind: FailureKind,
        /// Underlying message.
        message: String,
        /// Whether the failure halts the run.
        fatal: bool,
    },
    /// Every stage ran.
    WorkflowCompleted {
        /// Run id.
        run_id: Uuid,
        /// Run wall time.
        duration_ms: i64,
        /// Number of non-fatal stage failures.
        warnings: usize,
    },
    /// A fatal stage failed.
    WorkflowFailed {
        /// Run id.
        run_id: Uuid,
        /// Stage that halted the run.
        stage: StageId,
        /// Its error message.
        error: String,
    },
}

impl WorkflowEvent {
    /// Dotted event type, e.g. `stage.completed`.
    #[must_use]
    pub const fn event_type(&self) -> &'static str {
        match self {
            Self::WorkflowStarted { .. } => "workflow.started",
            Self::StageStarted { .. } => "stage.started",
            Self::StageCompleted { .. } => "stage.completed",
            Self::StageFailed { .. } => "stage.failed",
            Self::WorkflowCompleted { .. } => "workflow.completed",
            Self::WorkflowFailed { .. } => "workflow.failed",
        }
    }

    /// Run the event belongs to.
    #[must_use]
    pub const fn run_id(&self) -> Uuid {
        match self {
            Self::WorkflowStarted { run_id, .. }
            | Self::StageStarted { run_id, .. }
            | Self::StageCompleted { run_id, .. }
            | Self::StageFailed { run_id, .. }
            | Self::WorkflowCompleted { run_id, .. }
            | Self::WorkflowFailed { run_id, .. } => *run_id,
        }
    }

    /// Returns true for `stage.failed` and `workflow.failed`.
    #[must_use]
    pub const fn is_failure(&self) -> bool {
        matches!(self, Self::StageFailed { .. } | Self::WorkflowFailed { .. })
    }

    /// Event payload without the run id.
    #[must_use]
    pub fn to_data(&self) -> serde_json::Value {
        match self {
            Self::WorkflowStarted {
                image_path,
                restoration_level,
                time_span_years,
                ..
            } => json!({
                "image_path": image_path,
                "restoration_level": restoration_level,
                "time_span_years": time_span_years,
            }),
            Self::StageStarted { stage, .. } => json!({ "stage": stage }),
            Self::StageCompleted {
                stage, duration_ms, ..
            } => json!({ "stage": stage, "duration_ms": duration_ms }),
            Self::StageFailed {
                stage,
                kind,
                message,
                fatal,
                ..
            } => json!({
                "stage": stage,
                "kind": kind,
                "message": message,
                "fatal": fatal,
            }),
            Self::WorkflowCompleted {
                duration_ms,
                warnings,
                ..
            } => json!({ "duration_ms": duration_ms, "warnings": warnings }),
            Self::WorkflowFailed { stage, error, .. } => {
                json!({ "stage": stage, "error": error })
            }
        }
    }
}
