//! Error types for the restoreflow workflow.
//!
//! Stage-level failures are data (`StageResult` with an error status) and
//! never appear here. `WorkflowError` is reserved for failures that must stop
//! the caller: broken sequencing contracts, unusable configuration and I/O
//! outside any stage.

use crate::core::StageId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// The main error type for restoreflow operations.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// The orchestrator broke one of its own sequencing guarantees.
    #[error("{0}")]
    InvariantViolation(#[from] InvariantViolation),

    /// Provider configuration is missing or malformed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkflowError {
    /// Creates a configuration error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Returns true if this error is a contract violation inside the pipeline.
    #[must_use]
    pub fn is_invariant_violation(&self) -> bool {
        matches!(self, Self::InvariantViolation(_))
    }
}

/// Programming-contract violations detected by the workflow context.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum InvariantViolation {
    /// A stage output was written twice within one run.
    #[error("Duplicate stage write: stage '{stage}' already has an output in this run")]
    DuplicateStageWrite {
        /// The stage whose output was already recorded.
        stage: StageId,
    },
}

impl InvariantViolation {
    /// Creates a duplicate stage write violation.
    #[must_use]
    pub fn duplicate_stage_write(stage: StageId) -> Self {
        Self::DuplicateStageWrite { stage }
    }

    /// Stable code for diagnostics.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::DuplicateStageWrite { .. } => "INVARIANT-001-DUPLICATE_STAGE_WRITE",
        }
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("code".to_string(), serde_json::json!(self.code()));
        match self {
            Self::DuplicateStageWrite { stage } => {
                map.insert("stage".to_string(), serde_json::json!(stage.as_str()));
            }
        }
        map.insert("message".to_string(), serde_json::json!(self.to_string()));
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_stage_write_message() {
        let err = InvariantViolation::duplicate_stage_write(StageId::Historical);
        assert!(err.to_string().contains("historical"));
        assert_eq!(err.code(), "INVARIANT-001-DUPLICATE_STAGE_WRITE");
    }

    #[test]
    fn test_invariant_violation_to_dict() {
        let dict = InvariantViolation::duplicate_stage_write(StageId::Vision).to_dict();
        assert_eq!(dict.get("stage").unwrap(), "vision");
        assert!(dict.contains_key("message"));
    }

    #[test]
    fn test_workflow_error_from_violation() {
        let err: WorkflowError = InvariantViolation::duplicate_stage_write(StageId::Vision).into();
        assert!(err.is_invariant_violation());
        assert!(!WorkflowError::config("missing key").is_invariant_violation());
    }
}
