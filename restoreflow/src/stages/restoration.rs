//! Restoration stage: produces an image of the artifact in pristine state.

use super::{check_dependencies, finish, prompts, Stage};
use crate::capabilities::{
    enhance_image, CapabilityError, EnhanceSettings, ImageCapability, TextCapability, TextRequest,
};
use crate::context::{MessageRole, WorkflowContext};
use crate::core::{
    FailureKind, RestorationMethod, RestorationOutput, StageId, StagePayload, StageResult,
    WorkflowRequest,
};
use crate::errors::InvariantViolation;
use crate::parsing::UNKNOWN_ARTIFACT_TYPE;
use crate::utils::now_utc;
use async_trait::async_trait;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Second stage. Requires a successful vision output; its own failure does
/// not halt the workflow.
///
/// With image generation configured, the text model writes the generation
/// prompt and the image model renders it. Without it, or when the image
/// capability reports itself unavailable, the original image is enhanced
/// locally and the result is tagged [`RestorationMethod::EnhancedFallback`].
pub struct RestorationStage {
    text: Arc<dyn TextCapability>,
    image: Option<Arc<dyn ImageCapability>>,
    temperature: f32,
    enhance: EnhanceSettings,
}

impl RestorationStage {
    /// Creates the stage.
    #[must_use]
    pub fn new(
        text: Arc<dyn TextCapability>,
        image: Option<Arc<dyn ImageCapability>>,
        temperature: f32,
    ) -> Self {
        Self {
            text,
            image,
            temperature,
            enhance: EnhanceSettings::default(),
        }
    }

    /// Overrides the local enhancement factors.
    #[must_use]
    pub fn with_enhance_settings(mut self, settings: EnhanceSettings) -> Self {
        self.enhance = settings;
        self
    }

    async fn generate(
        &self,
        image: &dyn ImageCapability,
        ctx: &mut WorkflowContext,
        artifact_type: &str,
        request: &WorkflowRequest,
    ) -> Result<Vec<u8>, CapabilityError> {
        let stage = StageId::Restoration;
        let prompt = prompts::restoration_prompt(
            &ctx.build_context_summary(stage),
            artifact_type,
            request.restoration_level,
        );
        ctx.log_message(stage, MessageRole::Prompt, prompt.clone());

        let image_prompt = self
            .text
            .generate_text(&TextRequest::new(
                prompts::RESTORATION_INSTRUCTION,
                prompt,
                self.temperature,
            ))
            .await?;
        ctx.log_message(stage, MessageRole::Response, image_prompt.clone());

        ctx.log_message(stage, MessageRole::Prompt, image_prompt.clone());
        let bytes = image.generate_image(&image_prompt).await?;
        ctx.log_message(
            stage,
            MessageRole::Response,
            format!("<{} image bytes>", bytes.len()),
        );
        Ok(bytes)
    }

    async fn enhance_original(&self, path: &Path) -> Result<Vec<u8>, CapabilityError> {
        let original = tokio::fs::read(path).await?;
        let settings = self.enhance;
        tokio::task::spawn_blocking(move || enhance_image(&original, &settings))
            .await
            .map_err(|e| CapabilityError::Image(e.to_string()))?
    }
}

impl fmt::Debug for RestorationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestorationStage")
            .field("image_generation", &self.image.is_some())
            .field("temperature", &self.temperature)
            .field("enhance", &self.enhance)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Stage for RestorationStage {
    fn id(&self) -> StageId {
        StageId::Restoration
    }

    async fn run(
        &self,
        ctx: &mut WorkflowContext,
        request: &WorkflowRequest,
    ) -> Result<StageResult, InvariantViolation> {
        let stage = self.id();
        let started_at = now_utc();

        if let Some(missing) = check_dependencies(ctx, stage, &[StageId::Vision], started_at) {
            return Ok(missing);
        }

        let artifact_type = ctx
            .stage_output(StageId::Vision)
            .and_then(StageResult::as_vision)
            .map_or_else(|| UNKNOWN_ARTIFACT_TYPE.to_string(), |v| v.artifact_type.clone());
        ctx.set_fact("artifact_type", artifact_type.clone());

        let generated = match &self.image {
            Some(image) => self.generate(&**image, ctx, &artifact_type, request).await,
            None => Err(CapabilityError::Unavailable(
                "image generation is not configured".to_string(),
            )),
        };

        let (image, method) = match generated {
            Ok(bytes) => (bytes, RestorationMethod::Generated),
            Err(e) if e.is_unavailable() => {
                tracing::info!(reason = %e, "Using local enhancement for restoration");
                match self.enhance_original(&request.image_path).await {
                    Ok(bytes) => (bytes, RestorationMethod::EnhancedFallback),
                    Err(e) => {
                        let kind = if matches!(e, CapabilityError::Io(_)) {
                            FailureKind::InvalidInput
                        } else {
                            FailureKind::CapabilityFailure
                        };
                        tracing::warn!(error = %e, "Local enhancement failed");
                        return finish(
                            ctx,
                            StageResult::failure(
                                stage,
                                started_at,
                                kind,
                                format!("local enhancement failed: {e}"),
                            ),
                        );
                    }
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Restoration generation failed");
                return finish(ctx, StageResult::capability_failure(stage, started_at, e.to_string()));
            }
        };

        tracing::info!(method = %method, bytes = image.len(), "Restoration complete");
        finish(
            ctx,
            StageResult::success(
                stage,
                started_at,
                StagePayload::Restoration(RestorationOutput {
                    image,
                    method,
                    artifact_type,
                    restoration_level: request.restoration_level.to_string(),
                }),
            ),
        )
    }
}
