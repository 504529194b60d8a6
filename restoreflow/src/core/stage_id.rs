//! Stage identifiers and the fixed execution order.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the four fixed workflow stages.
///
/// The declaration order is the execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageId {
    /// Vision identification of the uploaded artifact.
    Vision,
    /// Pristine-state image regeneration.
    Restoration,
    /// Historical context lookup.
    Historical,
    /// Environmental degradation prediction.
    Environmental,
}

impl StageId {
    /// All stages in execution order.
    pub const ORDER: [Self; 4] = [
        Self::Vision,
        Self::Restoration,
        Self::Historical,
        Self::Environmental,
    ];

    /// Returns the canonical lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Vision => "vision",
            Self::Restoration => "restoration",
            Self::Historical => "historical",
            Self::Environmental => "environmental",
        }
    }

    /// Human readable agent name, used in logs and prompts.
    #[must_use]
    pub const fn agent_name(self) -> &'static str {
        match self {
            Self::Vision => "VisionAnalysisAgent",
            Self::Restoration => "RestorationGenerationAgent",
            Self::Historical => "HistoricalContextAgent",
            Self::Environmental => "EnvironmentalPredictionAgent",
        }
    }

    /// Returns true if a failure of this stage halts the workflow.
    ///
    /// Restoration is the only value-add stage; every other stage gates the
    /// prompts of the stages after it.
    #[must_use]
    pub const fn is_fatal(self) -> bool {
        !matches!(self, Self::Restoration)
    }

    /// Zero-based position in the execution order.
    #[must_use]
    pub const fn position(self) -> usize {
        match self {
            Self::Vision => 0,
            Self::Restoration => 1,
            Self::Historical => 2,
            Self::Environmental => 3,
        }
    }

    /// The stage that runs after this one, if any.
    #[must_use]
    pub fn next(self) -> Option<Self> {
        Self::ORDER.get(self.position() + 1).copied()
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StageId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "vision" => Ok(Self::Vision),
            "restoration" => Ok(Self::Restoration),
            "historical" => Ok(Self::Historical),
            "environmental" => Ok(Self::Environmental),
            other => Err(format!("unknown stage: {other}")),
        }
    }
}
