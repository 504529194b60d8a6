//! Stage result value objects.

use super::StageId;
use crate::degradation::DegradationPrediction;
use crate::parsing::ParsedFields;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Write as _};

/// Outcome of a single stage run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageStatus {
    /// The stage produced its payload.
    Success,
    /// The stage could not produce its payload.
    Error,
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Why a stage ended in error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// A required upstream stage did not succeed.
    MissingDependency,
    /// The model provider call failed.
    CapabilityFailure,
    /// The workflow input could not be used (e.g. unreadable image).
    InvalidInput,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingDependency => write!(f, "missing_dependency"),
            Self::CapabilityFailure => write!(f, "capability_failure"),
            Self::InvalidInput => write!(f, "invalid_input"),
        }
    }
}

/// Error details carried by a failed stage result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageError {
    /// Failure category.
    pub kind: FailureKind,
    /// Underlying message, preserved verbatim.
    pub message: String,
}

/// How the restored image was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RestorationMethod {
    /// Generated by the image capability.
    Generated,
    /// Local enhancement of the original bytes; image generation was unavailable.
    EnhancedFallback,
}

impl fmt::Display for RestorationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Generated => write!(f, "generated"),
            Self::EnhancedFallback => write!(f, "enhanced_fallback"),
        }
    }
}

/// Output of the vision stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisionAnalysis {
    /// Identification text and the fields parsed out of it.
    pub identification: ParsedFields,
    /// Canonical artifact type inferred from the identification.
    pub artifact_type: String,
}

impl VisionAnalysis {
    /// Material named by the identification, if any.
    #[must_use]
    pub fn material(&self) -> Option<&str> {
        self.identification.first_of(&["material", "materials"])
    }

    /// Current condition named by the identification, if any.
    #[must_use]
    pub fn condition(&self) -> Option<&str> {
        self.identification.get("condition")
    }
}

/// Output of the restoration stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestorationOutput {
    /// Restored image bytes.
    #[serde(with = "base64_bytes")]
    pub image: Vec<u8>,
    /// Whether the image was generated or locally enhanced.
    pub method: RestorationMethod,
    /// Artifact type the prompt was built for.
    pub artifact_type: String,
    /// Requested restoration intensity.
    pub restoration_level: String,
}

/// Output of the historical stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoricalContext {
    /// Historical narrative and any fields parsed out of it.
    pub context: ParsedFields,
}

/// Output of the environmental stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentalPrediction {
    /// Model narrative and any fields parsed out of it.
    pub predictions: ParsedFields,
    /// Deterministic degradation figures.
    pub degradation: DegradationPrediction,
}

/// Stage-specific structured data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StagePayload {
    /// Vision identification.
    Vision(VisionAnalysis),
    /// Restored image.
    Restoration(RestorationOutput),
    /// Historical context.
    Historical(HistoricalContext),
    /// Degradation prediction.
    Environmental(EnvironmentalPrediction),
}

/// Result produced by a stage handler.
///
/// `error` is present iff `status` is [`StageStatus::Error`]; `payload` is
/// present iff `status` is [`StageStatus::Success`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageResult {
    /// The stage that produced this result.
    pub stage: StageId,
    /// Success or error.
    pub status: StageStatus,
    /// Stage-specific data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<StagePayload>,
    /// Error details.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<StageError>,
    /// When the stage started.
    pub started_at: DateTime<Utc>,
    /// When the stage ended.
    pub ended_at: DateTime<Utc>,
}

impl StageResult {
    /// Creates a successful result.
    #[must_use]
    pub fn success(stage: StageId, started_at: DateTime<Utc>, payload: StagePayload) -> Self {
        Self {
            stage,
            status: StageStatus::Success,
            payload: Some(payload),
            error: None,
            started_at,
            ended_at: Utc::now(),
        }
    }

    /// Creates a failed result.
    #[must_use]
    pub fn failure(
        stage: StageId,
        started_at: DateTime<Utc>,
        kind: FailureKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            stage,
            status: StageStatus::Error,
            payload: None,
            error: Some(StageError {
                kind,
                message: message.into(),
            }),
            started_at,
            ended_at: Utc::now(),
        }
    }

    /// Creates a failed result for an unmet upstream dependency.
    #[must_use]
    pub fn missing_dependency(
        stage: StageId,
        started_at: DateTime<Utc>,
        message: impl Into<String>,
    ) -> Self {
        Self::failure(stage, started_at, FailureKind::MissingDependency, message)
    }

    /// Creates a failed result for a provider error.
    #[must_use]
    pub fn capability_failure(
        stage: StageId,
        started_at: DateTime<Utc>,
        message: impl Into<String>,
    ) -> Self {
        Self::failure(stage, started_at, FailureKind::CapabilityFailure, message)
    }

    /// Returns true if the stage succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self.status, StageStatus::Success)
    }

    /// Returns true if the stage failed.
    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self.status, StageStatus::Error)
    }

    /// The error message, present iff the stage failed.
    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        self.error.as_ref().map(|e| e.message.as_str())
    }

    /// The failure category, present iff the stage failed.
    #[must_use]
    pub fn failure_kind(&self) -> Option<FailureKind> {
        self.error.as_ref().map(|e| e.kind)
    }

    /// Returns the duration in milliseconds.
    #[must_use]
    pub fn duration_ms(&self) -> i64 {
        (self.ended_at - self.started_at).num_milliseconds()
    }

    /// Vision payload, if this is a successful vision result.
    #[must_use]
    pub fn as_vision(&self) -> Option<&VisionAnalysis> {
        match &self.payload {
            Some(StagePayload::Vision(v)) => Some(v),
            _ => None,
        }
    }

    /// Restoration payload, if this is a successful restoration result.
    #[must_use]
    pub fn as_restoration(&self) -> Option<&RestorationOutput> {
        match &self.payload {
            Some(StagePayload::Restoration(r)) => Some(r),
            _ => None,
        }
    }

    /// Historical payload, if this is a successful historical result.
    #[must_use]
    pub fn as_historical(&self) -> Option<&HistoricalContext> {
        match &self.payload {
            Some(StagePayload::Historical(h)) => Some(h),
            _ => None,
        }
    }

    /// Environmental payload, if this is a successful environmental result.
    #[must_use]
    pub fn as_environmental(&self) -> Option<&EnvironmentalPrediction> {
        match &self.payload {
            Some(StagePayload::Environmental(e)) => Some(e),
            _ => None,
        }
    }

    /// Renders the result for inclusion in a downstream prompt.
    ///
    /// Timestamps and raw image bytes are left out so the rendering depends
    /// only on what the stage produced.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = format!("status: {}\n", self.status);

        if let Some(error) = &self.error {
            let _ = writeln!(out, "error ({}): {}", error.kind, error.message);
        }

        match &self.payload {
            Some(StagePayload::Vision(vision)) => {
                let _ = writeln!(out, "artifact_type: {}", vision.artifact_type);
                render_fields(&mut out, &vision.identification);
            }
            Some(StagePayload::Restoration(restoration)) => {
                let _ = writeln!(out, "method: {}", restoration.method);
                let _ = writeln!(out, "artifact_type: {}", restoration.artifact_type);
                let _ = writeln!(out, "restoration_level: {}", restoration.restoration_level);
                let _ = writeln!(out, "image_bytes: {}", restoration.image.len());
            }
            Some(StagePayload::Historical(historical)) => {
                let _ = writeln!(out, "{}", historical.context.raw().trim());
            }
            Some(StagePayload::Environmental(env)) => {
                let d = &env.degradation;
                let _ = writeln!(
                    out,
                    "degradation: {}% over {} years ({})",
                    d.percentage,
                    d.years,
                    d.condition.description()
                );
                let _ = writeln!(out, "{}", env.predictions.raw().trim());
            }
            None => {}
        }

        out
    }
}

fn render_fields(out: &mut String, parsed: &ParsedFields) {
    if parsed.is_empty() {
        let _ = writeln!(out, "{}", parsed.raw().trim());
        return;
    }
    for (key, value) in parsed.fields() {
        let _ = writeln!(out, "{key}: {value}");
    }
}

mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vision_payload() -> StagePayload {
        StagePayload::Vision(VisionAnalysis {
            identification: ParsedFields::parse("TYPE: sculpture\nMATERIAL: stone"),
            artifact_type: "sculpture".to_string(),
        })
    }

    #[test]
    fn test_success_result() {
        let result = StageResult::success(StageId::Vision, Utc::now(), vision_payload());
        assert!(result.is_success());
        assert!(result.error_message().is_none());
        assert_eq!(result.as_vision().unwrap().material(), Some("stone"));
        assert!(result.as_restoration().is_none());
    }

    #[test]
    fn test_failure_result_has_message() {
        let result = StageResult::capability_failure(StageId::Historical, Utc::now(), "quota exceeded");
        assert!(result.is_error());
        assert!(result.payload.is_none());
        assert_eq!(result.error_message(), Some("quota exceeded"));
        assert_eq!(result.failure_kind(), Some(FailureKind::CapabilityFailure));
    }

    #[test]
    fn test_render_is_timestamp_free() {
        let a = StageResult::success(StageId::Vision, Utc::now(), vision_payload());
        std::thread::sleep(std::time::Duration::from_millis(2));
        let b = StageResult::success(StageId::Vision, Utc::now(), vision_payload());
        assert_eq!(a.render(), b.render());
        assert!(a.render().contains("type: sculpture"));
    }

    #[test]
    fn test_render_failure() {
        let result = StageResult::missing_dependency(StageId::Restoration, Utc::now(), "vision required");
        let rendered = result.render();
        assert!(rendered.contains("status: error"));
        assert!(rendered.contains("missing_dependency"));
    }

    #[test]
    fn test_restoration_image_serializes_as_base64() {
        let result = StageResult::success(
            StageId::Restoration,
            Utc::now(),
            StagePayload::Restoration(RestorationOutput {
                image: vec![0xde, 0xad, 0xbe, 0xef],
                method: RestorationMethod::EnhancedFallback,
                artifact_type: "pottery".to_string(),
                restoration_level: "medium".to_string(),
            }),
        );

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["payload"]["kind"], "restoration");
        assert_eq!(json["payload"]["image"], "3q2+7w==");
        assert_eq!(json["payload"]["method"], "enhanced_fallback");

        let back: StageResult = serde_json::from_value(json).unwrap();
        assert_eq!(back.as_restoration().unwrap().image, vec![0xde, 0xad, 0xbe, 0xef]);
    }

    #[test]
    fn test_status_display() {
        assert_eq!(StageStatus::Success.to_string(), "success");
        assert_eq!(FailureKind::MissingDependency.to_string(), "missing_dependency");
        assert_eq!(RestorationMethod::Generated.to_string(), "generated");
    }
}
