//! Stage trait and the four workflow stages.
//!
//! A stage never fails past its own boundary: unmet preconditions and
//! capability errors come back as error [`StageResult`]s. The only `Err` a
//! stage returns is an [`InvariantViolation`] from the context store.

mod environmental;
mod historical;
pub mod prompts;
mod restoration;
mod vision;

pub use environmental::EnvironmentalStage;
pub use historical::HistoricalStage;
pub use restoration::RestorationStage;
pub use vision::VisionStage;

use crate::context::{MessageRole, WorkflowContext};
use crate::core::{StageId, StageResult, WorkflowRequest};
use crate::errors::InvariantViolation;
use crate::utils::Timestamp;
use async_trait::async_trait;
use std::fmt::Debug;

/// One step of the workflow.
#[async_trait]
pub trait Stage: Send + Sync + Debug {
    /// Returns the stage this handler implements.
    fn id(&self) -> StageId;

    /// Runs the stage against the shared context.
    ///
    /// Successful and capability-failed results are recorded into `ctx`
    /// before returning; unmet preconditions are returned without recording.
    async fn run(
        &self,
        ctx: &mut WorkflowContext,
        request: &WorkflowRequest,
    ) -> Result<StageResult, InvariantViolation>;
}

/// Returns a missing-dependency result if any of `required` has not
/// succeeded in this run.
pub(crate) fn check_dependencies(
    ctx: &WorkflowContext,
    stage: StageId,
    required: &[StageId],
    started_at: Timestamp,
) -> Option<StageResult> {
    let missing: Vec<&str> = required
        .iter()
        .filter(|dep| !ctx.stage_succeeded(**dep))
        .map(|dep| dep.as_str())
        .collect();
    if missing.is_empty() {
        return None;
    }

    tracing::warn!(stage = %stage, missing = ?missing, "Stage precondition not met");
    Some(StageResult::missing_dependency(
        stage,
        started_at,
        format!("{stage} requires successful {} output", missing.join(" and ")),
    ))
}

/// Records `result` into the context and hands it back.
pub(crate) fn finish(
    ctx: &mut WorkflowContext,
    result: StageResult,
) -> Result<StageResult, InvariantViolation> {
    if let Some(message) = result.error_message() {
        ctx.log_message(result.stage, MessageRole::Note, format!("error: {message}"));
    }
    ctx.record_stage_output(result.stage, result.clone())?;
    Ok(result)
}
