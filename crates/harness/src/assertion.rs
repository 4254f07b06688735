//! Pure assertions over captured artifacts
//!
//! Assertions never mutate state and are deterministic given the same
//! artifacts; failures are recorded in the report, not thrown.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::capture::{Artifact, ArtifactValue};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "check", rename_all = "snake_case")]
pub enum Assertion {
    /// The named capture produced an artifact.
    Captured { artifact: String },

    /// Text artifact equals the expected string exactly.
    TextEquals { artifact: String, expected: String },

    /// Text artifact differs from every rejected value (after trimming).
    TextNotIn {
        artifact: String,
        rejected: Vec<String>,
    },

    /// Text artifact contains a substring.
    TextContains { artifact: String, needle: String },

    /// Value artifact equals an expected JSON value. No coercion: the
    /// captured type must match.
    ValueEquals { artifact: String, expected: Value },

    /// Value artifact is truthy (non-null, non-false, non-zero,
    /// non-empty).
    ValueTruthy { artifact: String },
}

/// PASS/FAIL plus a human-readable explanation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssertionOutcome {
    pub passed: bool,
    pub explanation: String,
}

fn pass(explanation: String) -> AssertionOutcome {
    AssertionOutcome {
        passed: true,
        explanation,
    }
}

fn fail(explanation: String) -> AssertionOutcome {
    AssertionOutcome {
        passed: false,
        explanation,
    }
}

impl Assertion {
    pub fn artifact_id(&self) -> &str {
        match self {
            Self::Captured { artifact }
            | Self::TextEquals { artifact, .. }
            | Self::TextNotIn { artifact, .. }
            | Self::TextContains { artifact, .. }
            | Self::ValueEquals { artifact, .. }
            | Self::ValueTruthy { artifact } => artifact,
        }
    }

    /// Judge the assertion against the artifacts captured so far.
    pub fn evaluate(&self, artifacts: &[Artifact]) -> AssertionOutcome {
        let id = self.artifact_id();
        let found = artifacts.iter().find(|a| a.id == id);

        match self {
            Self::Captured { .. } => match found {
                Some(a) => pass(format!("artifact '{id}' captured ({})", a.value.kind())),
                None => fail(format!("artifact '{id}' was not captured")),
            },

            Self::TextEquals { expected, .. } => match text_of(found) {
                Some(text) if text == *expected => {
                    pass(format!("artifact '{id}' text equals {expected:?}"))
                }
                Some(text) => fail(format!(
                    "artifact '{id}': expected {expected:?}, got {text:?}"
                )),
                None => fail(format!("artifact '{id}' has no text value")),
            },

            Self::TextNotIn { rejected, .. } => match text_of(found) {
                Some(text) => {
                    let trimmed = text.trim();
                    match rejected.iter().find(|r| r.as_str() == trimmed) {
                        None => pass(format!(
                            "artifact '{id}' text {trimmed:?} is not a rejected value"
                        )),
                        Some(hit) => fail(format!(
                            "artifact '{id}' text equals rejected value {hit:?}"
                        )),
                    }
                }
                None => fail(format!("artifact '{id}' has no text value")),
            },

            Self::TextContains { needle, .. } => match text_of(found) {
                Some(text) if text.contains(needle.as_str()) => {
                    pass(format!("artifact '{id}' text contains {needle:?}"))
                }
                Some(text) => fail(format!(
                    "artifact '{id}': {needle:?} not found in {text:?}"
                )),
                None => fail(format!("artifact '{id}' has no text value")),
            },

            Self::ValueEquals { expected, .. } => match value_of(found) {
                Some(value) if value == expected => {
                    pass(format!("artifact '{id}' value equals {expected}"))
                }
                Some(value) => fail(format!(
                    "artifact '{id}': expected {expected}, got {value}"
                )),
                None => fail(format!("artifact '{id}' has no structured value")),
            },

            Self::ValueTruthy { .. } => match value_of(found) {
                Some(value) if truthy(value) => {
                    pass(format!("artifact '{id}' value {value} is truthy"))
                }
                Some(value) => fail(format!("artifact '{id}' value {value} is falsy")),
                None => fail(format!("artifact '{id}' has no structured value")),
            },
        }
    }
}

fn text_of(artifact: Option<&Artifact>) -> Option<&str> {
    match artifact.map(|a| &a.value) {
        Some(ArtifactValue::Text { text }) => Some(text.as_str()),
        Some(ArtifactValue::Value {
            value: Value::String(s),
        }) => Some(s.as_str()),
        _ => None,
    }
}

fn value_of(artifact: Option<&Artifact>) -> Option<&Value> {
    match artifact.map(|a| &a.value) {
        Some(ArtifactValue::Value { value }) => Some(value),
        _ => None,
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(_) => true,
    }
}
