//! Deterministic degradation prediction.
//!
//! A per-material annual rate is applied linearly over the requested span and
//! capped at 100%. No model is involved, so the environmental stage can be
//! tested against exact numbers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Annual degradation rate (percent per year) for unrecognized materials.
pub const DEFAULT_RATE: f64 = 3.0;

/// Annual degradation rates in percent per year.
const MATERIAL_RATES: [(&str, f64); 8] = [
    ("paper", 4.5),
    ("canvas", 3.5),
    ("wood", 2.8),
    ("textile", 4.0),
    ("stone", 0.8),
    ("metal", 1.5),
    ("ceramic", 1.0),
    ("glass", 0.5),
];

/// Qualitative condition band, ordered from best to worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionBand {
    /// Below 10% degradation.
    Excellent,
    /// Below 25%.
    Good,
    /// Below 50%.
    Fair,
    /// Below 75%.
    Poor,
    /// 75% and above.
    Critical,
}

impl ConditionBand {
    /// Maps a degradation percentage onto its band.
    #[must_use]
    pub fn from_percentage(percentage: f64) -> Self {
        if percentage < 10.0 {
            Self::Excellent
        } else if percentage < 25.0 {
            Self::Good
        } else if percentage < 50.0 {
            Self::Fair
        } else if percentage < 75.0 {
            Self::Poor
        } else {
            Self::Critical
        }
    }

    /// Short label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Excellent => "Excellent",
            Self::Good => "Good",
            Self::Fair => "Fair",
            Self::Poor => "Poor",
            Self::Critical => "Critical",
        }
    }

    /// Label with a short description of what the band means.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Excellent => "Excellent - Minimal changes",
            Self::Good => "Good - Minor surface wear",
            Self::Fair => "Fair - Noticeable degradation, some detail loss",
            Self::Poor => "Poor - Significant deterioration",
            Self::Critical => "Critical - Severe damage, major restoration required",
        }
    }
}

impl fmt::Display for ConditionBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One point on the predicted degradation curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelinePoint {
    /// Years from now.
    pub year: u32,
    /// Cumulative degradation in percent, rounded to one decimal.
    pub percentage: f64,
    /// Band for this point.
    pub condition: ConditionBand,
}

/// Result of a degradation prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DegradationPrediction {
    /// Material as given by the caller.
    pub material: String,
    /// Table material the input resolved to, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_material: Option<String>,
    /// Span in years.
    pub years: u32,
    /// Annual rate applied, percent per year.
    pub annual_rate: f64,
    /// Degradation at the end of the span, rounded to one decimal.
    pub percentage: f64,
    /// Band at the end of the span.
    pub condition: ConditionBand,
    /// Points at 0, 1/4, 1/2, 3/4 and the full span.
    pub timeline: Vec<TimelinePoint>,
}

/// Injectable degradation calculation.
pub trait DegradationModel: Send + Sync + fmt::Debug {
    /// Predicts degradation of `material` over `years`.
    fn predict(&self, material: &str, years: u32) -> DegradationPrediction;
}

/// The fixed-table linear model.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearDegradationModel;

impl DegradationModel for LinearDegradationModel {
    fn predict(&self, material: &str, years: u32) -> DegradationPrediction {
        predict(material, years)
    }
}

/// Resolves a material description to a table entry and its annual rate.
///
/// Exact (case-insensitive) names match first; otherwise the first word of
/// the description that names a table material is used. Anything else gets
/// [`DEFAULT_RATE`].
#[must_use]
pub fn resolve_rate(material: &str) -> (Option<&'static str>, f64) {
    let normalized = material.trim().to_lowercase();
    let lookup = |name: &str| {
        MATERIAL_RATES
            .iter()
            .find(|(known, _)| *known == name)
            .map(|(known, rate)| (Some(*known), *rate))
    };

    if let Some(hit) = lookup(normalized.as_str()) {
        return hit;
    }

    normalized
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .find_map(lookup)
        .unwrap_or((None, DEFAULT_RATE))
}

fn cumulative(rate: f64, years: u32) -> f64 {
    (rate * f64::from(years)).min(100.0)
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Predicts degradation of `material` over `years` using the fixed table.
#[must_use]
pub fn predict(material: &str, years: u32) -> DegradationPrediction {
    let (matched, rate) = resolve_rate(material);
    let total = cumulative(rate, years);

    let three_quarters = u32::try_from(u64::from(years) * 3 / 4).unwrap_or(years);
    let mut checkpoints = vec![0, years / 4, years / 2, three_quarters, years];
    checkpoints.dedup();

    let timeline = checkpoints
        .into_iter()
        .map(|year| {
            let value = cumulative(rate, year);
            TimelinePoint {
                year,
                percentage: round_one_decimal(value),
                condition: ConditionBand::from_percentage(value),
            }
        })
        .collect();

    DegradationPrediction {
        material: material.to_string(),
        matched_material: matched.map(str::to_string),
        years,
        annual_rate: rate,
        percentage: round_one_decimal(total),
        condition: ConditionBand::from_percentage(total),
        timeline,
    }
}
