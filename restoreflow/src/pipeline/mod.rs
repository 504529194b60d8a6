//! Workflow execution.
//!
//! This module provides:
//! - The workflow state machine
//! - The sequential orchestrator with its fatal/non-fatal failure policy

mod orchestrator;
mod state;

pub use orchestrator::Orchestrator;
pub use state::WorkflowState;
