//! Recovering a structured result from loosely formatted model output
//!
//! Models are told to answer with bare JSON but regularly wrap it in code
//! fences or surround it with prose. Extraction runs an ordered list of
//! strategies and stops at the first one that yields a JSON object; the
//! object is then checked for the required keys and normalized.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use std::fmt;

use crate::analysis::error::AnalysisError;
use crate::analysis::types::{AnalysisResult, Sentiment};

pub type JsonObject = Map<String, Value>;

/// How the object was recovered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionStrategy {
    /// Whole reply parsed as-is
    Direct,
    /// Reply wrapped in ``` fences
    FenceStrip,
    /// Flat object mentioning both "summary" and "sentiment"
    KeyPattern,
    /// First `{` through last `}`
    OuterSpan,
    /// Brace-balanced object anywhere in the reply
    BalancedScan,
}

impl fmt::Display for ExtractionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExtractionStrategy::Direct => "direct",
            ExtractionStrategy::FenceStrip => "fence-strip",
            ExtractionStrategy::KeyPattern => "key-pattern",
            ExtractionStrategy::OuterSpan => "outer-span",
            ExtractionStrategy::BalancedScan => "balanced-scan",
        };
        f.write_str(name)
    }
}

type Extractor = fn(&str) -> Option<JsonObject>;

/// Tried in order; first hit wins.
const CASCADE: &[(ExtractionStrategy, Extractor)] = &[
    (ExtractionStrategy::Direct, parse_direct),
    (ExtractionStrategy::FenceStrip, parse_fenced),
    (ExtractionStrategy::KeyPattern, parse_key_pattern),
    (ExtractionStrategy::OuterSpan, parse_outer_span),
    (ExtractionStrategy::BalancedScan, parse_balanced_scan),
];

// Either key order; no nested braces inside the match.
static KEY_PATTERN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"\{[^{}]*"summary"[^{}]*"sentiment"[^{}]*\}|\{[^{}]*"sentiment"[^{}]*"summary"[^{}]*\}"#,
    )
    .expect("Invalid regex")
});

/// A validated result plus what it took to get it
#[derive(Debug, Clone, PartialEq)]
pub struct Rescued {
    pub result: AnalysisResult,
    pub strategy: ExtractionStrategy,
    /// The model's sentiment was outside the closed set and became neutral
    pub sentiment_corrected: bool,
    pub warnings: Vec<String>,
}

fn parse_object(text: &str) -> Option<JsonObject> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(object)) => Some(object),
        _ => None,
    }
}

fn parse_direct(reply: &str) -> Option<JsonObject> {
    parse_object(reply)
}

/// Body of a ```-fenced reply, with an optional language tag dropped.
fn strip_code_fence(reply: &str) -> Option<&str> {
    let rest = reply.strip_prefix("```")?;
    let rest = rest.trim_start_matches([' ', '\t']);
    let rest = rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    let rest = rest.trim_end();
    let rest = rest.strip_suffix("```").unwrap_or(rest);
    Some(rest.trim())
}

fn parse_fenced(reply: &str) -> Option<JsonObject> {
    strip_code_fence(reply).and_then(parse_object)
}

fn parse_key_pattern(reply: &str) -> Option<JsonObject> {
    KEY_PATTERN_RE
        .find_iter(reply)
        .find_map(|m| parse_object(m.as_str()))
}

fn parse_outer_span(reply: &str) -> Option<JsonObject> {
    let start = reply.find('{')?;
    let end = reply.rfind('}')?;
    if end <= start {
        return None;
    }
    parse_object(&reply[start..=end])
}

fn parse_balanced_scan(reply: &str) -> Option<JsonObject> {
    reply
        .match_indices('{')
        .filter_map(|(idx, _)| extract_json_object(&reply[idx..]))
        .filter_map(parse_object)
        .find(|object| object.contains_key("summary") && object.contains_key("sentiment"))
}

/// Cut the brace-balanced object at the start of `s`, ignoring braces
/// inside string literals.
fn extract_json_object(s: &str) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escape = false;

    for (i, c) in s.char_indices() {
        if escape {
            escape = false;
            continue;
        }
        match c {
            '\\' if in_string => escape = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(&s[..=i]);
                }
            }
            _ => {}
        }
    }

    None
}

/// Run the cascade over the raw reply text.
pub fn extract_object(reply: &str) -> Option<(ExtractionStrategy, JsonObject)> {
    let reply = reply.trim();
    CASCADE
        .iter()
        .find_map(|(strategy, extractor)| extractor(reply).map(|object| (*strategy, object)))
}

fn require<'a>(object: &'a JsonObject, field: &'static str) -> Result<&'a Value, AnalysisError> {
    object.get(field).ok_or_else(|| AnalysisError::SchemaViolation {
        field,
        object: Value::Object(object.clone()),
    })
}

fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn optional_confidence(object: &JsonObject, warnings: &mut Vec<String>) -> Option<f64> {
    match object.get("confidence_score") {
        None | Some(Value::Null) => None,
        Some(value) => {
            let score = value.as_f64();
            if score.is_none() {
                warnings.push(format!("Ignoring non-numeric confidence_score: {}", value));
            }
            score
        }
    }
}

fn optional_topics(object: &JsonObject, warnings: &mut Vec<String>) -> Option<Vec<String>> {
    match object.get("key_topics") {
        None | Some(Value::Null) => None,
        Some(Value::Array(items)) => Some(
            items
                .iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s.clone()),
                    Value::Number(n) => Some(n.to_string()),
                    Value::Bool(b) => Some(b.to_string()),
                    _ => None,
                })
                .collect(),
        ),
        Some(other) => {
            warnings.push(format!("Ignoring non-array key_topics: {}", other));
            None
        }
    }
}

fn optional_word_count(object: &JsonObject, warnings: &mut Vec<String>) -> Option<u64> {
    match object.get("word_count") {
        None | Some(Value::Null) => None,
        Some(value) => {
            let count = value.as_u64().or_else(|| {
                value
                    .as_f64()
                    .filter(|f| *f >= 0.0 && f.fract() == 0.0 && *f <= u64::MAX as f64)
                    .map(|f| f as u64)
            });
            if count.is_none() {
                warnings.push(format!("Ignoring invalid word_count: {}", value));
            }
            count
        }
    }
}

/// Check required keys and normalize an extracted object.
pub fn validate_object(
    object: &JsonObject,
) -> Result<(AnalysisResult, bool, Vec<String>), AnalysisError> {
    let summary = require(object, "summary")?;
    let sentiment_value = require(object, "sentiment")?;

    let mut warnings = Vec::new();
    let (sentiment, corrected) = Sentiment::normalize(sentiment_value);
    if corrected {
        warnings.push(format!(
            "Invalid sentiment value {}, defaulting to neutral",
            sentiment_value
        ));
    }

    let result = AnalysisResult {
        summary: value_to_text(summary),
        sentiment,
        confidence_score: optional_confidence(object, &mut warnings),
        key_topics: optional_topics(object, &mut warnings),
        word_count: optional_word_count(object, &mut warnings),
    };

    Ok((result, corrected, warnings))
}

/// Turn a raw model reply into a validated result.
pub fn rescue(reply: &str) -> Result<Rescued, AnalysisError> {
    let (strategy, object) = extract_object(reply).ok_or_else(|| {
        log::error!("No JSON object found in model reply: {}", reply);
        AnalysisError::ParseFailure {
            raw: reply.to_string(),
        }
    })?;

    if strategy != ExtractionStrategy::Direct {
        log::warn!("Direct JSON parsing failed, recovered object via {}", strategy);
    }

    let (result, sentiment_corrected, warnings) = validate_object(&object)?;
    for warning in &warnings {
        log::warn!("{}", warning);
    }

    Ok(Rescued {
        result,
        strategy,
        sentiment_corrected,
        warnings,
    })
}
