//! Response protocol enforcement.
//!
//! AI responses are untrusted JSON from an external system. They are
//! deserialized into exact tagged shapes — every field mandatory, risk
//! levels closed, confidence range-checked, validation token compared — and
//! anything that does not match is rejected, never coerced. The only
//! leniency is a repair step that extracts an embedded JSON object when the
//! model wrapped it in prose.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Pass 1 risk classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

/// Pass 1 response shape. All fields mandatory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pass1Assessment {
    pub risk: RiskLevel,
    pub confidence: f64,
    pub context: String,
    pub legitimate_signals: Vec<String>,
    pub validation_token: u64,
}

/// Pass 2 response shape. All fields mandatory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pass2Assessment {
    pub safe: bool,
    pub confidence: f64,
    pub threats: Vec<String>,
    pub reasoning: String,
    pub validation_token: u64,
}

/// Protocol integrity violations.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("response is not valid protocol JSON: {0}")]
    Unparseable(String),

    #[error("validation token mismatch: expected {expected}, got {got}")]
    TokenMismatch { expected: u64, got: u64 },

    #[error("confidence out of range: {0}")]
    ConfidenceOutOfRange(f64),
}

/// Parse and verify a Pass 1 response.
pub fn parse_pass1(raw: &str, expected_token: u64) -> Result<Pass1Assessment, ProtocolError> {
    let assessment: Pass1Assessment = parse_with_repair(raw)?;
    verify_token(assessment.validation_token, expected_token)?;
    verify_confidence(assessment.confidence)?;
    Ok(assessment)
}

/// Parse and verify a Pass 2 response.
pub fn parse_pass2(raw: &str, expected_token: u64) -> Result<Pass2Assessment, ProtocolError> {
    let assessment: Pass2Assessment = parse_with_repair(raw)?;
    verify_token(assessment.validation_token, expected_token)?;
    verify_confidence(assessment.confidence)?;
    Ok(assessment)
}

/// Strict parse, then one repair attempt on the embedded JSON object.
fn parse_with_repair<T: for<'de> Deserialize<'de>>(raw: &str) -> Result<T, ProtocolError> {
    match serde_json::from_str(raw) {
        Ok(value) => Ok(value),
        Err(first_err) => {
            if let Some(embedded) = extract_json_object(raw) {
                if let Ok(value) = serde_json::from_str(embedded) {
                    return Ok(value);
                }
            }
            Err(ProtocolError::Unparseable(first_err.to_string()))
        }
    }
}

/// Locate the outermost JSON object inside prose.
fn extract_json_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end > start {
        Some(&raw[start..=end])
    } else {
        None
    }
}

fn verify_token(got: u64, expected: u64) -> Result<(), ProtocolError> {
    if got != expected {
        return Err(ProtocolError::TokenMismatch { expected, got });
    }
    Ok(())
}

fn verify_confidence(confidence: f64) -> Result<(), ProtocolError> {
    if !(0.0..=1.0).contains(&confidence) || confidence.is_nan() {
        return Err(ProtocolError::ConfidenceOutOfRange(confidence));
    }
    Ok(())
}
