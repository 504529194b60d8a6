//! Core domain model types for restoreflow.
//!
//! This module contains the fundamental types used throughout the crate:
//! - Stage identifiers and the fixed execution order
//! - Stage results and their stage-specific payloads
//! - The workflow request and aggregate workflow result

mod result;
mod stage_id;
mod workflow;

pub use result::{
    EnvironmentalPrediction, FailureKind, HistoricalContext, RestorationMethod,
    RestorationOutput, StageError, StagePayload, StageResult, StageStatus, VisionAnalysis,
};
pub use stage_id::StageId;
pub use workflow::{
    ContextStats, RestorationLevel, WorkflowRequest, WorkflowResult, WorkflowStatus,
};
