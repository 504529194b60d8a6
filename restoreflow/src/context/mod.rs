//! Context management for workflow execution.
//!
//! This module provides:
//! - Insertion-ordered bags for artifact facts and stage outputs
//! - The per-run workflow context and its conversation log
//! - Deterministic context summaries for prompt construction

mod bags;
#[cfg(test)]
mod context_tests;
mod workflow;

pub use bags::{FactBag, StageOutputLog};
pub use workflow::{ConversationEntry, MessageRole, WorkflowContext};
