//! Workflow request and aggregate result types.

use super::{StageId, StageResult};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use uuid::Uuid;

/// Requested restoration intensity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RestorationLevel {
    /// Conservative reconstruction.
    Light,
    /// Balanced reconstruction.
    #[default]
    Medium,
    /// Full reconstruction of missing parts.
    Heavy,
}

impl RestorationLevel {
    /// Returns the lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Medium => "medium",
            Self::Heavy => "heavy",
        }
    }
}

impl fmt::Display for RestorationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RestorationLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(Self::Light),
            "medium" => Ok(Self::Medium),
            "heavy" | "high" => Ok(Self::Heavy),
            other => Err(format!("unknown restoration level: {other}")),
        }
    }
}

/// Input of one workflow run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowRequest {
    /// Path of the uploaded artifact image.
    pub image_path: PathBuf,
    /// Restoration intensity.
    #[serde(default)]
    pub restoration_level: RestorationLevel,
    /// Span of the degradation prediction in years.
    #[serde(default = "default_time_span")]
    pub time_span_years: u32,
    /// Material to use instead of the one identified by vision.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material_override: Option<String>,
}

const fn default_time_span() -> u32 {
    10
}

impl WorkflowRequest {
    /// Creates a request with medium restoration over ten years.
    #[must_use]
    pub fn new(image_path: impl Into<PathBuf>) -> Self {
        Self {
            image_path: image_path.into(),
            restoration_level: RestorationLevel::default(),
            time_span_years: default_time_span(),
            material_override: None,
        }
    }

    /// Sets the restoration level.
    #[must_use]
    pub fn with_restoration_level(mut self, level: RestorationLevel) -> Self {
        self.restoration_level = level;
        self
    }

    /// Sets the prediction span.
    #[must_use]
    pub fn with_time_span(mut self, years: u32) -> Self {
        self.time_span_years = years;
        self
    }

    /// Forces the material used for degradation prediction.
    #[must_use]
    pub fn with_material(mut self, material: impl Into<String>) -> Self {
        self.material_override = Some(material.into());
        self
    }
}

/// Terminal status of a workflow run.
///
/// Serialized as `completed` or `failed_at_<stage>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkflowStatus {
    /// Every stage ran and no fatal stage failed.
    Completed,
    /// A fatal stage failed; nothing after it ran.
    FailedAt(StageId),
}

impl WorkflowStatus {
    /// Returns true for [`WorkflowStatus::Completed`].
    #[must_use]
    pub const fn is_completed(self) -> bool {
        matches!(self, Self::Completed)
    }

    /// The stage that halted the run, if any.
    #[must_use]
    pub const fn failed_stage(self) -> Option<StageId> {
        match self {
            Self::Completed => None,
            Self::FailedAt(stage) => Some(stage),
        }
    }
}

impl fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed => f.write_str("completed"),
            Self::FailedAt(stage) => write!(f, "failed_at_{stage}"),
        }
    }
}

impl FromStr for WorkflowStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "completed" {
            return Ok(Self::Completed);
        }
        s.strip_prefix("failed_at_")
            .ok_or_else(|| format!("unknown workflow status: {s}"))?
            .parse()
            .map(Self::FailedAt)
    }
}

impl Serialize for WorkflowStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for WorkflowStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Size of the workflow context at the end of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextStats {
    /// Number of artifact facts.
    pub facts: usize,
    /// Number of recorded stage outputs.
    pub stage_outputs: usize,
    /// Number of conversation log entries.
    pub conversation_length: usize,
}

/// Aggregate result of one workflow run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowResult {
    /// Unique id of the run.
    pub run_id: Uuid,
    /// Terminal status.
    pub status: WorkflowStatus,
    /// Stages that actually ran, in order.
    pub executed_stages: Vec<StageId>,
    /// Result of every executed stage.
    pub stages: IndexMap<StageId, StageResult>,
    /// Error message of the stage that halted the run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Failures of non-fatal stages.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    /// Context size at the end of the run.
    pub context: ContextStats,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the run ended.
    pub ended_at: DateTime<Utc>,
}

impl WorkflowResult {
    /// Returns true if the run completed.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.status.is_completed()
    }

    /// Result of `stage`, if it ran.
    #[must_use]
    pub fn stage(&self, stage: StageId) -> Option<&StageResult> {
        self.stages.get(&stage)
    }

    /// Returns the duration in milliseconds.
    #[must_use]
    pub fn duration_ms(&self) -> i64 {
        (self.ended_at - self.started_at).num_milliseconds()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_display() {
        assert_eq!(WorkflowStatus::Completed.to_string(), "completed");
        assert_eq!(
            WorkflowStatus::FailedAt(StageId::Vision).to_string(),
            "failed_at_vision"
        );
    }

    #[test]
    fn test_status_serde() {
        let json = serde_json::to_string(&WorkflowStatus::FailedAt(StageId::Historical)).unwrap();
        assert_eq!(json, r#""failed_at_historical""#);

        let back: WorkflowStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(back, WorkflowStatus::FailedAt(StageId::Historical));
        assert!(serde_json::from_str::<WorkflowStatus>(r#""failed_at_nowhere""#).is_err());
    }

    #[test]
    fn test_restoration_level_parse() {
        assert_eq!("Light".parse::<RestorationLevel>().unwrap(), RestorationLevel::Light);
        assert_eq!("high".parse::<RestorationLevel>().unwrap(), RestorationLevel::Heavy);
        assert!("extreme".parse::<RestorationLevel>().is_err());
    }

    #[test]
    fn test_request_builder() {
        let request = WorkflowRequest::new("bust.jpg")
            .with_restoration_level(RestorationLevel::Heavy)
            .with_time_span(25)
            .with_material("stone");

        assert_eq!(request.time_span_years, 25);
        assert_eq!(request.material_override.as_deref(), Some("stone"));
        assert_eq!(request.restoration_level.as_str(), "heavy");
    }

    #[test]
    fn test_request_defaults_from_json() {
        let request: WorkflowRequest =
            serde_json::from_str(r#"{"image_path": "uploads/vase.png"}"#).unwrap();
        assert_eq!(request.time_span_years, 10);
        assert_eq!(request.restoration_level, RestorationLevel::Medium);
    }
}
