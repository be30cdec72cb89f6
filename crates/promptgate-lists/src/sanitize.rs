//! Write-time phrase hygiene.
//!
//! Custom phrases are user-controlled strings that later run as substring
//! matchers, so malicious entries must be rejected when a list is edited —
//! never at match time, which stays a plain scan.

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Minimum phrase length in characters.
pub const MIN_PHRASE_LENGTH: usize = 2;
/// Maximum phrase length in characters.
pub const MAX_PHRASE_LENGTH: usize = 100;

/// Characters allowed in custom phrases: letters, digits, spaces, and a
/// small punctuation set.
const ALLOWED_CHARACTERS: &str = r"^[a-zA-Z0-9\s\-_'.#@]+$";

/// Substrings that indicate a phrase is itself an attack vector.
const FORBIDDEN_PATTERNS: &[(&str, &str)] = &[
    (r"(?i)script", "script keyword"),
    (r"(?i)eval", "eval keyword"),
    (r"(?i)exec", "exec keyword"),
    (r"(?i)system", "system keyword"),
    (r"(?i)rm\s+-rf", "dangerous command"),
    (r"\.\.", "path traversal"),
    (r"(?i)\.env", "environment file reference"),
    (r"(?i)/etc/passwd", "system file reference"),
    (r"(?i)DROP\s+TABLE", "SQL injection"),
    (r"(?i)base64", "encoding attempt"),
    (r"(?i)\\x[0-9a-f]{2}", "hex encoding"),
];

/// Phrase rejected at list-edit time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SanitizeError {
    #[error("phrase cannot be empty")]
    Empty,

    #[error("phrase must be at least {MIN_PHRASE_LENGTH} characters")]
    TooShort,

    #[error("phrase cannot exceed {MAX_PHRASE_LENGTH} characters")]
    TooLong,

    #[error("phrase contains invalid characters; allowed: letters, numbers, spaces, - _ ' . # @")]
    InvalidCharacters,

    #[error("phrase matches forbidden pattern: {0}")]
    Forbidden(&'static str),
}

/// An accepted phrase, lowercased, with an optional hygiene warning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SanitizedPhrase {
    pub phrase: String,
    /// Present for single-word phrases, which match too broadly.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// Validate and lowercase one phrase.
pub fn sanitize_phrase(phrase: &str) -> Result<SanitizedPhrase, SanitizeError> {
    let trimmed = phrase.trim();

    if trimmed.is_empty() {
        return Err(SanitizeError::Empty);
    }
    if trimmed.len() < MIN_PHRASE_LENGTH {
        return Err(SanitizeError::TooShort);
    }
    if trimmed.len() > MAX_PHRASE_LENGTH {
        return Err(SanitizeError::TooLong);
    }

    let allowed = Regex::new(ALLOWED_CHARACTERS).unwrap();
    if !allowed.is_match(trimmed) {
        return Err(SanitizeError::InvalidCharacters);
    }

    for &(pattern, description) in FORBIDDEN_PATTERNS {
        if Regex::new(pattern).unwrap().is_match(trimmed) {
            return Err(SanitizeError::Forbidden(description));
        }
    }

    let warning = if trimmed.split_whitespace().count() == 1 {
        Some(
            "single-word phrase may cause false positives; add context \
             (e.g. \"reset password\" instead of \"password\")"
                .to_string(),
        )
    } else {
        None
    };

    Ok(SanitizedPhrase {
        phrase: trimmed.to_lowercase(),
        warning,
    })
}

/// Sanitize both lists, partitioning accepted phrases from rejections.
pub fn sanitize_rules(
    whitelist: &[String],
    blacklist: &[String],
) -> (Vec<SanitizedPhrase>, Vec<SanitizedPhrase>, Vec<(String, SanitizeError)>) {
    let mut accepted_wl = Vec::new();
    let mut accepted_bl = Vec::new();
    let mut rejected = Vec::new();

    for phrase in whitelist {
        match sanitize_phrase(phrase) {
            Ok(p) => accepted_wl.push(p),
            Err(e) => rejected.push((phrase.clone(), e)),
        }
    }
    for phrase in blacklist {
        match sanitize_phrase(phrase) {
            Ok(p) => accepted_bl.push(p),
            Err(e) => rejected.push((phrase.clone(), e)),
        }
    }

    (accepted_wl, accepted_bl, rejected)
}
