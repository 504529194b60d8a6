//! Vision stage: identifies the artifact in the uploaded image.

use super::{finish, prompts, Stage};
use crate::capabilities::{ImageInput, VisionCapability};
use crate::context::{MessageRole, WorkflowContext};
use crate::core::{FailureKind, StageId, StagePayload, StageResult, VisionAnalysis, WorkflowRequest};
use crate::errors::InvariantViolation;
use crate::parsing::{infer_artifact_type, ParsedFields};
use crate::utils::now_utc;
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::fmt;
use std::sync::Arc;

/// First stage. Has no precondition.
///
/// Sets the `image_path`, `image_sha256` and `identification` facts.
pub struct VisionStage {
    vision: Arc<dyn VisionCapability>,
}

impl VisionStage {
    /// Creates the stage.
    #[must_use]
    pub fn new(vision: Arc<dyn VisionCapability>) -> Self {
        Self { vision }
    }
}

impl fmt::Debug for VisionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VisionStage").finish_non_exhaustive()
    }
}

#[async_trait]
impl Stage for VisionStage {
    fn id(&self) -> StageId {
        StageId::Vision
    }

    async fn run(
        &self,
        ctx: &mut WorkflowContext,
        request: &WorkflowRequest,
    ) -> Result<StageResult, InvariantViolation> {
        let stage = self.id();
        let started_at = now_utc();
        let path = &request.image_path;

        ctx.set_fact("image_path", path.display().to_string());

        let image = match ImageInput::read(path).await {
            Ok(image) => image,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Cannot read artifact image");
                return finish(
                    ctx,
                    StageResult::failure(
                        stage,
                        started_at,
                        FailureKind::InvalidInput,
                        format!("cannot read image {}: {e}", path.display()),
                    ),
                );
            }
        };
        ctx.set_fact("image_sha256", hex::encode(Sha256::digest(&image.bytes)));

        let prompt = prompts::vision_prompt(&ctx.build_context_summary(stage));
        ctx.log_message(stage, MessageRole::Prompt, prompt.clone());

        let identification = match self.vision.identify(&image, &prompt).await {
            Ok(text) if text.trim().is_empty() => {
                return finish(
                    ctx,
                    StageResult::capability_failure(stage, started_at, "empty identification"),
                );
            }
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(error = %e, "Vision identification failed");
                return finish(ctx, StageResult::capability_failure(stage, started_at, e.to_string()));
            }
        };
        ctx.log_message(stage, MessageRole::Response, identification.clone());
        ctx.set_fact("identification", identification.clone());

        let parsed = ParsedFields::parse(identification);
        let artifact_type = infer_artifact_type(parsed.raw());
        tracing::info!(
            artifact_type = %artifact_type,
            fields = parsed.fields().len(),
            "Vision analysis complete"
        );

        finish(
            ctx,
            StageResult::success(
                stage,
                started_at,
                StagePayload::Vision(VisionAnalysis {
                    identification: parsed,
                    artifact_type,
                }),
            ),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{write_sample_image, ScriptedVision};
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_success_sets_facts_and_payload() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_sample_image(dir.path(), "bust.png");
        let vision = Arc::new(ScriptedVision::replying("TYPE: Marble statue\nMATERIALS: stone"));
        let stage = VisionStage::new(vision.clone());
        let mut ctx = WorkflowContext::new();

        let result = stage.run(&mut ctx, &WorkflowRequest::new(&path)).await.unwrap();

        assert!(result.is_success());
        let analysis = result.as_vision().unwrap();
        assert_eq!(analysis.artifact_type, "sculpture");
        assert_eq!(analysis.material(), Some("stone"));

        let keys = ctx.facts().keys();
        assert_eq!(keys, vec!["image_path", "image_sha256", "identification"]);
        assert_eq!(ctx.fact_str("image_sha256").map(str::len), Some(64));
        assert_eq!(ctx.stage_output(StageId::Vision), Some(&result));
        assert_eq!(vision.calls(), 1);

        let roles: Vec<MessageRole> = ctx.conversation().iter().map(|e| e.role).collect();
        assert_eq!(roles, vec![MessageRole::Prompt, MessageRole::Response]);
    }

    #[tokio::test]
    async fn test_unreadable_image_is_invalid_input() {
        let vision = Arc::new(ScriptedVision::replying("TYPE: vase"));
        let stage = VisionStage::new(vision.clone());
        let mut ctx = WorkflowContext::new();

        let result = stage
            .run(&mut ctx, &WorkflowRequest::new("/no/such/artifact.jpg"))
            .await
            .unwrap();

        assert_eq!(result.failure_kind(), Some(FailureKind::InvalidInput));
        assert_eq!(vision.calls(), 0);
        assert!(ctx.stage_output(StageId::Vision).is_some());
        assert!(ctx.fact("identification").is_none());
    }

    #[tokio::test]
    async fn test_provider_error_is_preserved() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_sample_image(dir.path(), "vase.png");
        let stage = VisionStage::new(Arc::new(ScriptedVision::failing("quota exhausted")));
        let mut ctx = WorkflowContext::new();

        let result = stage.run(&mut ctx, &WorkflowRequest::new(&path)).await.unwrap();

        assert_eq!(result.failure_kind(), Some(FailureKind::CapabilityFailure));
        assert!(result.error_message().unwrap().contains("quota exhausted"));
        assert!(ctx.fact("identification").is_none());
    }

    #[tokio::test]
    async fn test_unstructured_reply_still_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_sample_image(dir.path(), "plate.png");
        let stage = VisionStage::new(Arc::new(ScriptedVision::replying(
            "A glazed ceramic plate with a chipped rim",
        )));
        let mut ctx = WorkflowContext::new();

        let result = stage.run(&mut ctx, &WorkflowRequest::new(&path)).await.unwrap();

        let analysis = result.as_vision().unwrap();
        assert!(analysis.identification.is_empty());
        assert_eq!(analysis.artifact_type, "pottery");
    }
}
