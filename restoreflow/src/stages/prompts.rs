//! Role instructions and prompt templates.

use crate::core::RestorationLevel;
use crate::degradation::DegradationPrediction;
use crate::parsing::truncate_chars;
use std::fmt::Write as _;

/// Longest context summary embedded in the restoration prompt, in characters.
pub const RESTORATION_CONTEXT_CHARS: usize = 1500;

/// Instruction for vision identification. Fixes the `KEY: value` layout the
/// later stages parse.
pub const VISION_INSTRUCTION: &str = "\
You are a computer vision specialist for cultural heritage objects.
Examine the photograph and report exactly what is visible: artifact type,
damage (cracks, chips, fading, losses), materials, style and period clues,
inscriptions or markings.

Answer using one field per line:
TYPE: <artifact type>
NAME: <name if recognizable, otherwise Unknown>
PERIOD: <estimated period>
MATERIALS: <visible materials>
CONDITION: <overall condition as a percentage>
DAMAGE: <visible damage>
MISSING_PARTS: <missing or broken parts>
DESCRIPTION: <detailed visual description>";

/// Instruction for writing the image-generation prompt.
pub const RESTORATION_INSTRUCTION: &str = "\
You are an artifact conservator writing a prompt for an image generator.
Describe the artifact in its original, complete state: every missing or
damaged part restored, authentic materials, colors and surface finish for
its type and period, neutral museum lighting. Mention no damage or aging.
Reply with the prompt only.";

/// Instruction for historical research.
pub const HISTORICAL_INSTRUCTION: &str = "\
You are a historian and museum curator. Relate the visual evidence you are
given to documented history. Be specific and scholarly; say so when the
evidence is inconclusive.";

/// Instruction for environmental prediction.
pub const ENVIRONMENTAL_INSTRUCTION: &str = "\
You are a conservation scientist specialising in material degradation and
preventive conservation. Give numerical, actionable guidance.";

/// Builds the vision prompt. `summary` is usually empty for the first stage.
pub fn vision_prompt(summary: &str) -> String {
    if summary.is_empty() {
        VISION_INSTRUCTION.to_string()
    } else {
        format!("{VISION_INSTRUCTION}\n\n{summary}")
    }
}

/// Builds the request that asks the text model for an image prompt.
pub fn restoration_prompt(summary: &str, artifact_type: &str, level: RestorationLevel) -> String {
    let summary = truncate_chars(summary, RESTORATION_CONTEXT_CHARS);
    let detail = match level {
        RestorationLevel::Light => "Stabilise and clean; reconstruct only small losses.",
        RestorationLevel::Medium => "Repair damage and reconstruct missing parts where evidence allows.",
        RestorationLevel::Heavy => "Reconstruct the artifact fully as it looked when first made.",
    };
    format!(
        "{summary}\n\nARTIFACT TYPE: {artifact_type}\nRESTORATION LEVEL: {level}\n{detail}\n\n\
         Write a detailed prompt for a photorealistic image of the restored {artifact_type}."
    )
}

/// Builds the historical research prompt.
pub fn historical_prompt(summary: &str) -> String {
    format!(
        "{summary}\n\
         Based on the analysis above, provide:\n\
         IDENTIFICATION: what the artifact is, with name and location if famous\n\
         HISTORICAL_PERIOD: era and culture of creation\n\
         CULTURAL_SIGNIFICANCE: why it matters\n\
         ORIGINAL_STATE: how it looked when first made\n\
         SIMILAR_ARTIFACTS: related pieces in collections\n\
         CONSERVATION_NOTES: special care for this kind of object"
    )
}

/// Builds the environmental prediction prompt around the computed figures.
pub fn environmental_prompt(
    summary: &str,
    material: &str,
    condition: &str,
    prediction: &DegradationPrediction,
) -> String {
    let mut out = format!(
        "{summary}\n\
         PREDICTION TASK\n\
         Time span: {} years\n\
         Materials: {material}\n\
         Current condition: {condition}\n\
         Baseline model: {:.1}% per year, {:.1}% after {} years ({})\n",
        prediction.years,
        prediction.annual_rate,
        prediction.percentage,
        prediction.years,
        prediction.condition.description(),
    );
    for point in &prediction.timeline {
        let _ = writeln!(out, "  year {}: {:.1}%", point.year, point.percentage);
    }
    out.push_str(
        "\nProvide:\n\
         LOCATION_ASSESSMENT: likely storage or display environment\n\
         ENVIRONMENTAL_RISKS: threats in that environment\n\
         RISK_FACTORS: temperature, humidity, light and pollution effects\n\
         RECOMMENDATIONS: conservation interventions\n\
         CRITICAL_POINTS: when urgent action is required",
    );
    out
}
