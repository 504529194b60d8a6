//! Environmental stage: degradation prediction.

use super::{check_dependencies, finish, prompts, Stage};
use crate::capabilities::{TextCapability, TextRequest};
use crate::context::{MessageRole, WorkflowContext};
use crate::core::{EnvironmentalPrediction, StageId, StagePayload, StageResult, WorkflowRequest};
use crate::degradation::{DegradationModel, LinearDegradationModel};
use crate::errors::InvariantViolation;
use crate::parsing::ParsedFields;
use crate::utils::now_utc;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

const UNKNOWN: &str = "unknown";

/// Last stage. Requires vision and historical.
///
/// The quantitative prediction comes from the injected [`DegradationModel`];
/// the text model only adds narrative around it.
pub struct EnvironmentalStage {
    text: Arc<dyn TextCapability>,
    temperature: f32,
    model: Arc<dyn DegradationModel>,
}

impl EnvironmentalStage {
    /// Creates the stage with the fixed-table model.
    #[must_use]
    pub fn new(text: Arc<dyn TextCapability>, temperature: f32) -> Self {
        Self {
            text,
            temperature,
            model: Arc::new(LinearDegradationModel),
        }
    }

    /// Replaces the degradation model.
    #[must_use]
    pub fn with_model(mut self, model: Arc<dyn DegradationModel>) -> Self {
        self.model = model;
        self
    }
}

impl fmt::Debug for EnvironmentalStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvironmentalStage")
            .field("temperature", &self.temperature)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Stage for EnvironmentalStage {
    fn id(&self) -> StageId {
        StageId::Environmental
    }

    async fn run(
        &self,
        ctx: &mut WorkflowContext,
        request: &WorkflowRequest,
    ) -> Result<StageResult, InvariantViolation> {
        let stage = self.id();
        let started_at = now_utc();

        if let Some(missing) = check_dependencies(
            ctx,
            stage,
            &[StageId::Vision, StageId::Historical],
            started_at,
        ) {
            return Ok(missing);
        }

        let vision = ctx
            .stage_output(StageId::Vision)
            .and_then(StageResult::as_vision);
        let material = request
            .material_override
            .as_deref()
            .or_else(|| vision.and_then(|v| v.material()))
            .unwrap_or(UNKNOWN)
            .to_string();
        let condition = vision
            .and_then(|v| v.condition())
            .unwrap_or(UNKNOWN)
            .to_string();

        let degradation = self.model.predict(&material, request.time_span_years);
        tracing::debug!(
            material = %material,
            years = degradation.years,
            percentage = degradation.percentage,
            condition = %degradation.condition,
            "Degradation computed"
        );

        let prompt = prompts::environmental_prompt(
            &ctx.build_context_summary(stage),
            &material,
            &condition,
            &degradation,
        );
        ctx.log_message(stage, MessageRole::Prompt, prompt.clone());

        let text_request =
            TextRequest::new(prompts::ENVIRONMENTAL_INSTRUCTION, prompt, self.temperature);
        let text = match self.text.generate_text(&text_request).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(error = %e, "Environmental prediction failed");
                return finish(ctx, StageResult::capability_failure(stage, started_at, e.to_string()));
            }
        };
        ctx.log_message(stage, MessageRole::Response, text.clone());

        tracing::info!(
            years = degradation.years,
            condition = %degradation.condition,
            "Environmental prediction complete"
        );

        finish(
            ctx,
            StageResult::success(
                stage,
                started_at,
                StagePayload::Environmental(EnvironmentalPrediction {
                    predictions: ParsedFields::parse(text),
                    degradation,
                }),
            ),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{FailureKind, HistoricalContext, VisionAnalysis};
    use crate::degradation::{ConditionBand, DegradationPrediction};
    use crate::testing::ScriptedText;
    use chrono::Utc;
    use parking_lot::Mutex;

    #[derive(Debug, Default)]
    struct RecordingModel {
        calls: Mutex<Vec<(String, u32)>>,
    }

    impl DegradationModel for RecordingModel {
        fn predict(&self, material: &str, years: u32) -> DegradationPrediction {
            self.calls.lock().push((material.to_string(), years));
            crate::degradation::predict(material, years)
        }
    }

    fn ready_context(identification: &str) -> WorkflowContext {
        let mut ctx = WorkflowContext::new();
        ctx.record_stage_output(
            StageId::Vision,
            StageResult::success(
                StageId::Vision,
                Utc::now(),
                StagePayload::Vision(VisionAnalysis {
                    identification: ParsedFields::parse(identification),
                    artifact_type: "sculpture".to_string(),
                }),
            ),
        )
        .unwrap();
        ctx.record_stage_output(
            StageId::Historical,
            StageResult::success(
                StageId::Historical,
                Utc::now(),
                StagePayload::Historical(HistoricalContext {
                    context: ParsedFields::parse("Roman copy of a Greek original"),
                }),
            ),
        )
        .unwrap();
        ctx
    }

    #[tokio::test]
    async fn test_uses_identified_material() {
        let model = Arc::new(RecordingModel::default());
        let text = Arc::new(ScriptedText::replying("RECOMMENDATIONS: keep humidity below 50%"));
        let stage = EnvironmentalStage::new(text.clone(), 0.3).with_model(model.clone());
        let mut ctx = ready_context("MATERIALS: Stone\nCONDITION: 70%");

        let result = stage
            .run(&mut ctx, &WorkflowRequest::new("s.jpg").with_time_span(20))
            .await
            .unwrap();

        let env = result.as_environmental().unwrap();
        assert!((env.degradation.percentage - 16.0).abs() < f64::EPSILON);
        assert_eq!(env.degradation.condition, ConditionBand::Good);
        assert_eq!(env.predictions.get("recommendations"), Some("keep humidity below 50%"));
        assert_eq!(model.calls.lock().clone(), vec![("Stone".to_string(), 20)]);

        let prompt = &text.requests()[0].prompt;
        assert!(prompt.contains("Current condition: 70%"));
        assert!(prompt.contains("16.0% after 20 years"));
    }

    #[tokio::test]
    async fn test_material_override_wins() {
        let model = Arc::new(RecordingModel::default());
        let stage = EnvironmentalStage::new(Arc::new(ScriptedText::replying("ok")), 0.3)
            .with_model(model.clone());
        let mut ctx = ready_context("MATERIAL: bronze");

        let request = WorkflowRequest::new("s.jpg")
            .with_time_span(10)
            .with_material("paper");
        stage.run(&mut ctx, &request).await.unwrap();

        assert_eq!(model.calls.lock()[0].0, "paper");
    }

    #[tokio::test]
    async fn test_missing_material_uses_default_rate() {
        let stage = EnvironmentalStage::new(Arc::new(ScriptedText::replying("ok")), 0.3);
        let mut ctx = ready_context("TYPE: sculpture");

        let result = stage
            .run(&mut ctx, &WorkflowRequest::new("s.jpg").with_time_span(10))
            .await
            .unwrap();

        let degradation = &result.as_environmental().unwrap().degradation;
        assert_eq!(degradation.material, "unknown");
        assert!((degradation.percentage - 30.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_requires_historical() {
        let text = Arc::new(ScriptedText::replying("unused"));
        let stage = EnvironmentalStage::new(text.clone(), 0.3);
        let mut ctx = WorkflowContext::new();
        ctx.record_stage_output(
            StageId::Vision,
            StageResult::capability_failure(StageId::Vision, Utc::now(), "x"),
        )
        .unwrap();

        let result = stage
            .run(&mut ctx, &WorkflowRequest::new("s.jpg"))
            .await
            .unwrap();

        assert_eq!(result.failure_kind(), Some(FailureKind::MissingDependency));
        assert_eq!(text.calls(), 0);
        assert!(ctx.stage_output(StageId::Environmental).is_none());
    }
}
