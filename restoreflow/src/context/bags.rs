//! Insertion-ordered fact and stage-output bags.

use crate::core::{StageId, StageResult};
use crate::errors::InvariantViolation;
use indexmap::IndexMap;

/// Free-form artifact facts.
///
/// Any key may be written; the last write wins and keeps the key's original
/// position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FactBag {
    data: IndexMap<String, serde_json::Value>,
}

impl FactBag {
    /// Creates a new empty fact bag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets a fact, or `None` if it was never set.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.data.get(key)
    }

    /// Checks if a key exists.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// Sets a fact, overwriting any previous value.
    pub fn set(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.data.insert(key.into(), value);
    }

    /// Iterates facts in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &serde_json::Value)> {
        self.data.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Returns all keys in insertion order.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.data.keys().cloned().collect()
    }

    /// Returns the number of facts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if no fact has been set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Removes every fact.
    pub fn clear(&mut self) {
        self.data.clear();
    }
}

/// Per-stage results in execution order.
///
/// Each stage may be written once per run; entries are never removed except
/// by [`StageOutputLog::clear`] at the start of a new run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StageOutputLog {
    outputs: IndexMap<StageId, StageResult>,
}

impl StageOutputLog {
    /// Creates a new empty output log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets the result of a stage.
    #[must_use]
    pub fn get(&self, stage: StageId) -> Option<&StageResult> {
        self.outputs.get(&stage)
    }

    /// Checks if a stage has a result.
    #[must_use]
    pub fn contains(&self, stage: StageId) -> bool {
        self.outputs.contains_key(&stage)
    }

    /// Records the result of a stage.
    ///
    /// # Errors
    ///
    /// Returns `InvariantViolation::DuplicateStageWrite` if the stage already
    /// has a result.
    pub fn insert(&mut self, stage: StageId, result: StageResult) -> Result<(), InvariantViolation> {
        if self.outputs.contains_key(&stage) {
            return Err(InvariantViolation::duplicate_stage_write(stage));
        }
        self.outputs.insert(stage, result);
        Ok(())
    }

    /// Iterates results in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (StageId, &StageResult)> {
        self.outputs.iter().map(|(k, v)| (*k, v))
    }

    /// Returns the stages with results, in insertion order.
    #[must_use]
    pub fn stages(&self) -> Vec<StageId> {
        self.outputs.keys().copied().collect()
    }

    /// Returns the number of stages with results.
    #[must_use]
    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    /// Returns true if no result has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }

    /// Removes every result.
    pub fn clear(&mut self) {
        self.outputs.clear();
    }
}
