//! The per-run workflow context shared by the stages.

use super::{FactBag, StageOutputLog};
use crate::core::{ContextStats, StageId, StageResult};
use crate::errors::InvariantViolation;
use crate::utils::{now_utc, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Write as _};

/// Who produced a conversation log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// Prompt sent to a capability.
    Prompt,
    /// Text returned by a capability.
    Response,
    /// Orchestrator bookkeeping.
    Note,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Prompt => write!(f, "prompt"),
            Self::Response => write!(f, "response"),
            Self::Note => write!(f, "note"),
        }
    }
}

/// One audit entry. Never read for control decisions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationEntry {
    /// Stage the entry belongs to.
    pub stage: StageId,
    /// Role of the entry.
    pub role: MessageRole,
    /// Text content.
    pub text: String,
    /// When the entry was appended.
    pub timestamp: Timestamp,
}

/// Accumulating state of one workflow run.
///
/// Owned by exactly one in-flight run. Facts may be overwritten; stage
/// outputs are written once and never removed until [`WorkflowContext::reset`].
#[derive(Debug, Clone, Default)]
pub struct WorkflowContext {
    facts: FactBag,
    outputs: StageOutputLog,
    conversation: Vec<ConversationEntry>,
}

impl WorkflowContext {
    /// Creates an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears facts, stage outputs and the conversation log.
    pub fn reset(&mut self) {
        self.facts.clear();
        self.outputs.clear();
        self.conversation.clear();
    }

    /// Sets a fact; the last write wins.
    pub fn set_fact(&mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) {
        self.facts.set(key, value.into());
    }

    /// Gets a fact, or `None` if it was never set in this run.
    #[must_use]
    pub fn fact(&self, key: &str) -> Option<&serde_json::Value> {
        self.facts.get(key)
    }

    /// Gets a string fact.
    #[must_use]
    pub fn fact_str(&self, key: &str) -> Option<&str> {
        self.facts.get(key).and_then(serde_json::Value::as_str)
    }

    /// All facts.
    #[must_use]
    pub fn facts(&self) -> &FactBag {
        &self.facts
    }

    /// Records the result of `stage`.
    ///
    /// # Errors
    ///
    /// Returns `InvariantViolation::DuplicateStageWrite` if `stage` already
    /// has an output in this run.
    pub fn record_stage_output(
        &mut self,
        stage: StageId,
        result: StageResult,
    ) -> Result<(), InvariantViolation> {
        debug_assert_eq!(stage, result.stage, "result recorded under another stage");
        self.outputs.insert(stage, result)
    }

    /// Gets the output of `stage`, or `None` if it has not run.
    #[must_use]
    pub fn stage_output(&self, stage: StageId) -> Option<&StageResult> {
        self.outputs.get(stage)
    }

    /// Returns true if `stage` ran and succeeded in this run.
    #[must_use]
    pub fn stage_succeeded(&self, stage: StageId) -> bool {
        self.outputs.get(stage).is_some_and(StageResult::is_success)
    }

    /// All stage outputs.
    #[must_use]
    pub fn stage_outputs(&self) -> &StageOutputLog {
        &self.outputs
    }

    /// Appends an entry to the conversation log.
    pub fn log_message(&mut self, stage: StageId, role: MessageRole, text: impl Into<String>) {
        self.conversation.push(ConversationEntry {
            stage,
            role,
            text: text.into(),
            timestamp: now_utc(),
        });
    }

    /// The conversation log in append order.
    #[must_use]
    pub fn conversation(&self) -> &[ConversationEntry] {
        &self.conversation
    }

    /// Current size of the context.
    #[must_use]
    pub fn stats(&self) -> ContextStats {
        ContextStats {
            facts: self.facts.len(),
            stage_outputs: self.outputs.len(),
            conversation_length: self.conversation.len(),
        }
    }

    /// Renders facts and prior stage outputs for the next stage's prompt.
    ///
    /// The rendering is a pure function of the facts and stage outputs, in
    /// insertion order. `for_stage` is accepted for logging only and does not
    /// change the output.
    #[must_use]
    pub fn build_context_summary(&self, for_stage: StageId) -> String {
        tracing::trace!(stage = %for_stage, "Building context summary");

        let mut out = String::new();

        if !self.facts.is_empty() {
            out.push_str("=== ARTIFACT CONTEXT ===\n");
            for (key, value) in self.facts.iter() {
                match value {
                    serde_json::Value::String(s) => {
                        let _ = writeln!(out, "{key}: {s}");
                    }
                    other => {
                        let _ = writeln!(out, "{key}: {other}");
                    }
                }
            }
            out.push('\n');
        }

        if !self.outputs.is_empty() {
            out.push_str("=== PREVIOUS STAGE OUTPUTS ===\n");
            for (stage, result) in self.outputs.iter() {
                let _ = writeln!(out, "\n--- {} output ---", stage.agent_name());
                out.push_str(&result.render());
            }
            out.push('\n');
        }

        out
    }
}
