//! Best-effort extraction of `KEY: value` fields from free-text model output.
//!
//! Models are asked to answer in a `KEY: value` line format, but nothing
//! guarantees they do. Parsing therefore never fails: a missing field is
//! simply absent, and the raw text is always kept next to the parsed fields.

use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Longest normalized key accepted as a field name.
const MAX_KEY_LEN: usize = 40;

/// Artifact type used when nothing in the identification matches.
pub const UNKNOWN_ARTIFACT_TYPE: &str = "unknown";

/// Raw model output plus the fields found in it, in order of appearance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedFields {
    raw: String,
    fields: IndexMap<String, String>,
}

impl ParsedFields {
    /// Parses `text`, splitting each line on its first colon.
    ///
    /// Keys are lower-cased with spaces turned into underscores. A later line
    /// with the same key overwrites the earlier value.
    #[must_use]
    pub fn parse(text: impl Into<String>) -> Self {
        let raw = text.into();
        let mut fields = IndexMap::new();

        for line in raw.lines() {
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let key = normalize_key(key);
            let value = clean_value(value);
            if key.is_empty() || key.len() > MAX_KEY_LEN || value.is_empty() {
                continue;
            }
            fields.insert(key, value.to_string());
        }

        Self { raw, fields }
    }

    /// The unparsed text.
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// All parsed fields, in order of first appearance.
    #[must_use]
    pub fn fields(&self) -> &IndexMap<String, String> {
        &self.fields
    }

    /// Looks up a field; `key` is normalized the same way as parsed keys.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(&normalize_key(key)).map(String::as_str)
    }

    /// Returns the first present field among `keys`.
    #[must_use]
    pub fn first_of(&self, keys: &[&str]) -> Option<&str> {
        keys.iter().find_map(|key| self.get(key))
    }

    /// Returns true if no field was found.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Normalizes a field name: trims markdown decoration, lower-cases, and
/// replaces spaces with underscores.
#[must_use]
pub fn normalize_key(key: &str) -> String {
    key.trim()
        .trim_matches(|c: char| c == '*' || c == '#' || c == '-' || c == '_' || c.is_whitespace())
        .to_lowercase()
        .replace(' ', "_")
}

fn clean_value(value: &str) -> &str {
    value
        .trim()
        .trim_matches(|c: char| c == '*' || c.is_whitespace())
}

/// Cuts `text` to at most `max` characters, on a character boundary.
#[must_use]
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

fn type_field_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)\bTYPE\s*\**\s*:\s*\**\s*([^\n]+)").expect("static regex is valid")
    })
}

/// Infers a canonical artifact type from a vision identification.
///
/// Looks for a `TYPE:` field (case-insensitive) and maps it onto a small set
/// of artifact families. Without a structured field, falls back to a keyword
/// search over the whole text and finally to [`UNKNOWN_ARTIFACT_TYPE`].
#[must_use]
pub fn infer_artifact_type(identification: &str) -> String {
    if let Some(captures) = type_field_pattern().captures(identification) {
        let type_text = clean_value(&captures[1]).to_lowercase();
        if let Some(family) = map_type_text(&type_text) {
            return family;
        }
    }
    keyword_fallback(&identification.to_lowercase()).to_string()
}

fn map_type_text(type_text: &str) -> Option<String> {
    let has = |needle: &str| type_text.contains(needle);

    let family = if has("sculpt") || has("statue") {
        "sculpture"
    } else if has("monument") || has("architecture") {
        "monument"
    } else if has("paint") {
        "painting"
    } else if has("pottery") || has("ceramic") || has("vase") {
        "pottery"
    } else if has("relief") || has("carving") || has("bronze") || has("metal") {
        "sculpture"
    } else if has("textile") || has("fabric") {
        "textile"
    } else {
        return type_text
            .split_whitespace()
            .next()
            .map(|word| word.trim_matches(|c: char| !c.is_alphanumeric()))
            .filter(|word| !word.is_empty())
            .map(str::to_string);
    };
    Some(family.to_string())
}

fn keyword_fallback(text: &str) -> &'static str {
    let has = |needle: &str| text.contains(needle);

    if has("sculpt") || has("statue") {
        "sculpture"
    } else if has("monument") {
        "monument"
    } else if has("paint") && has("canvas") {
        "painting"
    } else if has("pottery") || has("ceramic") {
        "pottery"
    } else {
        UNKNOWN_ARTIFACT_TYPE
    }
}
