//! Comprehensive tests for context module.

#[cfg(test)]
mod tests {
    use crate::context::{MessageRole, WorkflowContext};
    use crate::core::{StageId, StagePayload, StageResult, VisionAnalysis};
    use crate::errors::InvariantViolation;
    use crate::parsing::ParsedFields;
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    fn vision_success() -> StageResult {
        StageResult::success(
            StageId::Vision,
            Utc::now(),
            StagePayload::Vision(VisionAnalysis {
                identification: ParsedFields::parse("TYPE: sculpture\nMATERIAL: stone"),
                artifact_type: "sculpture".to_string(),
            }),
        )
    }

    fn populated() -> WorkflowContext {
        let mut ctx = WorkflowContext::new();
        ctx.set_fact("image_path", "uploads/bust.jpg");
        ctx.set_fact("identification", "TYPE: sculpture\nMATERIAL: stone");
        ctx.record_stage_output(StageId::Vision, vision_success()).unwrap();
        ctx.record_stage_output(
            StageId::Restoration,
            StageResult::capability_failure(StageId::Restoration, Utc::now(), "image quota"),
        )
        .unwrap();
        ctx.log_message(StageId::Vision, MessageRole::Prompt, "identify");
        ctx
    }

    #[test]
    fn test_new_context_is_empty() {
        let ctx = WorkflowContext::new();
        assert_eq!(ctx.stats().facts, 0);
        assert_eq!(ctx.stats().stage_outputs, 0);
        assert!(ctx.conversation().is_empty());
        assert_eq!(ctx.build_context_summary(StageId::Vision), "");
    }

    #[test]
    fn test_fact_absent_vs_present() {
        let mut ctx = WorkflowContext::new();
        assert!(ctx.fact("image_path").is_none());

        ctx.set_fact("image_path", "a.jpg");
        ctx.set_fact("image_path", "b.jpg");
        assert_eq!(ctx.fact_str("image_path"), Some("b.jpg"));

        ctx.set_fact("years", 20);
        assert_eq!(ctx.fact("years"), Some(&serde_json::json!(20)));
        assert_eq!(ctx.fact_str("years"), None);
    }

    #[test]
    fn test_duplicate_stage_write_fails() {
        let mut ctx = WorkflowContext::new();
        ctx.record_stage_output(StageId::Vision, vision_success()).unwrap();

        let err = ctx
            .record_stage_output(StageId::Vision, vision_success())
            .unwrap_err();
        assert_eq!(err, InvariantViolation::duplicate_stage_write(StageId::Vision));
    }

    #[test]
    fn test_stage_succeeded() {
        let ctx = populated();
        assert!(ctx.stage_succeeded(StageId::Vision));
        assert!(!ctx.stage_succeeded(StageId::Restoration));
        assert!(!ctx.stage_succeeded(StageId::Historical));
        assert!(ctx.stage_output(StageId::Historical).is_none());
    }

    #[test]
    fn test_summary_is_pure() {
        let ctx = populated();
        let first = ctx.build_context_summary(StageId::Historical);
        let second = ctx.build_context_summary(StageId::Historical);
        assert_eq!(first, second);
    }

    #[test]
    fn test_summary_ignores_requesting_stage() {
        let ctx = populated();
        assert_eq!(
            ctx.build_context_summary(StageId::Restoration),
            ctx.build_context_summary(StageId::Environmental)
        );
    }

    #[test]
    fn test_summary_ignores_conversation_log() {
        let mut ctx = populated();
        let before = ctx.build_context_summary(StageId::Historical);
        ctx.log_message(StageId::Vision, MessageRole::Response, "TYPE: sculpture");
        assert_eq!(before, ctx.build_context_summary(StageId::Historical));
    }

    #[test]
    fn test_summary_layout() {
        let ctx = populated();
        let summary = ctx.build_context_summary(StageId::Historical);

        let facts_at = summary.find("=== ARTIFACT CONTEXT ===").unwrap();
        let outputs_at = summary.find("=== PREVIOUS STAGE OUTPUTS ===").unwrap();
        let vision_at = summary.find("--- VisionAnalysisAgent output ---").unwrap();
        let restoration_at = summary.find("--- RestorationGenerationAgent output ---").unwrap();

        assert!(facts_at < outputs_at);
        assert!(vision_at < restoration_at);
        assert!(summary.contains("image_path: uploads/bust.jpg"));
        assert!(summary.contains("error (capability_failure): image quota"));
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut ctx = populated();
        ctx.reset();

        assert!(ctx.fact("image_path").is_none());
        assert!(ctx.stage_output(StageId::Vision).is_none());
        assert!(ctx.conversation().is_empty());
        assert!(ctx.facts().is_empty());
        assert!(ctx.stage_outputs().is_empty());

        ctx.record_stage_output(StageId::Vision, vision_success()).unwrap();
    }

    #[test]
    fn test_conversation_log_appends() {
        let mut ctx = WorkflowContext::new();
        ctx.log_message(StageId::Vision, MessageRole::Prompt, "identify this");
        ctx.log_message(StageId::Vision, MessageRole::Response, "TYPE: vase");

        let roles: Vec<MessageRole> = ctx.conversation().iter().map(|e| e.role).collect();
        assert_eq!(roles, vec![MessageRole::Prompt, MessageRole::Response]);
        assert!(ctx.conversation()[0].timestamp <= ctx.conversation()[1].timestamp);
        assert_eq!(ctx.stats().conversation_length, 2);
    }
}
