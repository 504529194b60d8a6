//! Historical stage.

use super::{check_dependencies, finish, prompts, Stage};
use crate::capabilities::{TextCapability, TextRequest};
use crate::context::{MessageRole, WorkflowContext};
use crate::core::{HistoricalContext, StageId, StagePayload, StageResult, WorkflowRequest};
use crate::errors::InvariantViolation;
use crate::parsing::ParsedFields;
use crate::utils::now_utc;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

/// Third stage. Requires vision; runs whether or not restoration succeeded.
pub struct HistoricalStage {
    text: Arc<dyn TextCapability>,
    temperature: f32,
}

impl HistoricalStage {
    /// Creates the stage.
    #[must_use]
    pub fn new(text: Arc<dyn TextCapability>, temperature: f32) -> Self {
        Self { text, temperature }
    }
}

impl fmt::Debug for HistoricalStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HistoricalStage")
            .field("temperature", &self.temperature)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Stage for HistoricalStage {
    fn id(&self) -> StageId {
        StageId::Historical
    }

    async fn run(
        &self,
        ctx: &mut WorkflowContext,
        _request: &WorkflowRequest,
    ) -> Result<StageResult, InvariantViolation> {
        let stage = self.id();
        let started_at = now_utc();

        if let Some(missing) = check_dependencies(ctx, stage, &[StageId::Vision], started_at) {
            return Ok(missing);
        }

        let prompt = prompts::historical_prompt(&ctx.build_context_summary(stage));
        ctx.log_message(stage, MessageRole::Prompt, prompt.clone());

        let request = TextRequest::new(prompts::HISTORICAL_INSTRUCTION, prompt, self.temperature);
        let text = match self.text.generate_text(&request).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(error = %e, "Historical research failed");
                return finish(ctx, StageResult::capability_failure(stage, started_at, e.to_string()));
            }
        };
        ctx.log_message(stage, MessageRole::Response, text.clone());

        let context = ParsedFields::parse(text);
        tracing::info!(fields = context.fields().len(), "Historical context retrieved");

        finish(
            ctx,
            StageResult::success(
                stage,
                started_at,
                StagePayload::Historical(HistoricalContext { context }),
            ),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{FailureKind, VisionAnalysis};
    use crate::testing::ScriptedText;
    use chrono::Utc;

    fn context_with_vision_and_failed_restoration() -> WorkflowContext {
        let mut ctx = WorkflowContext::new();
        ctx.set_fact("identification", "TYPE: fresco");
        ctx.record_stage_output(
            StageId::Vision,
            StageResult::success(
                StageId::Vision,
                Utc::now(),
                StagePayload::Vision(VisionAnalysis {
                    identification: ParsedFields::parse("TYPE: fresco"),
                    artifact_type: "fresco".to_string(),
                }),
            ),
        )
        .unwrap();
        ctx.record_stage_output(
            StageId::Restoration,
            StageResult::capability_failure(StageId::Restoration, Utc::now(), "image quota"),
        )
        .unwrap();
        ctx
    }

    #[tokio::test]
    async fn test_runs_in_degraded_mode() {
        let text = Arc::new(ScriptedText::replying(
            "IDENTIFICATION: Pompeian fresco\nHISTORICAL_PERIOD: 1st century CE",
        ));
        let stage = HistoricalStage::new(text.clone(), 0.2);
        let mut ctx = context_with_vision_and_failed_restoration();

        let result = stage
            .run(&mut ctx, &WorkflowRequest::new("f.jpg"))
            .await
            .unwrap();

        let history = result.as_historical().unwrap();
        assert_eq!(history.context.get("historical_period"), Some("1st century CE"));

        let sent = &text.requests()[0];
        assert_eq!(sent.system, prompts::HISTORICAL_INSTRUCTION);
        assert!(sent.prompt.contains("--- VisionAnalysisAgent output ---"));
        assert!(sent.prompt.contains("error (capability_failure): image quota"));
    }

    #[tokio::test]
    async fn test_requires_vision() {
        let text = Arc::new(ScriptedText::replying("unused"));
        let stage = HistoricalStage::new(text.clone(), 0.2);
        let mut ctx = WorkflowContext::new();

        let result = stage
            .run(&mut ctx, &WorkflowRequest::new("f.jpg"))
            .await
            .unwrap();

        assert_eq!(result.failure_kind(), Some(FailureKind::MissingDependency));
        assert_eq!(text.calls(), 0);
    }

    #[tokio::test]
    async fn test_provider_failure() {
        let stage = HistoricalStage::new(Arc::new(ScriptedText::failing("503 overloaded")), 0.2);
        let mut ctx = context_with_vision_and_failed_restoration();

        let result = stage
            .run(&mut ctx, &WorkflowRequest::new("f.jpg"))
            .await
            .unwrap();

        assert_eq!(result.failure_kind(), Some(FailureKind::CapabilityFailure));
        assert!(result.error_message().unwrap().contains("503 overloaded"));
        assert!(ctx.stage_output(StageId::Historical).is_some());
    }
}
