//! Business / educational context classification.
//!
//! An attack-shaped pattern inside a recognized business or educational
//! context is not blocked outright; it is escalated to AI arbitration
//! instead. Educational context takes precedence over business context when
//! both are present.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::families::ThreatFamily;

/// Distinct business keywords required before the business signal fires.
///
/// Empirically chosen in production with no documented derivation; kept as a
/// named constant rather than re-derived. An explicit ticket/order-number
/// reference fires the signal on its own.
pub const BUSINESS_KEYWORD_THRESHOLD: usize = 2;

const BUSINESS_KEYWORDS: &[&str] = &[
    "meeting", "discussed", "yesterday", "approved", "emergency",
    "process", "standard", "policy", "procedure", "management",
    "directive", "quarterly", "budget", "projection", "order #",
    "ticket #", "refund", "subscription", "support team", "supervisor",
];

const EDUCATIONAL_KEYWORDS: &[&str] = &[
    "educational", "example", "explain", "training", "course", "lesson",
    "tutorial", "demonstrate", "learn", "teach", "academic", "research",
    "paper", "thesis", "study", "security team", "for my", "how does",
    "what is", "can you explain",
];

/// Which context family was recognized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextType {
    Business,
    Educational,
}

impl ContextType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContextType::Business => "business",
            ContextType::Educational => "educational",
        }
    }
}

impl std::fmt::Display for ContextType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Evidence that a matched attack pattern may be legitimate discussion.
///
/// Populated only when an attack family co-occurs with a context signal;
/// carried into the AI escalation prompt so the model evaluates with the
/// same evidence the engine saw.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextSignal {
    /// Always true when the signal exists; kept for wire compatibility.
    pub detected: bool,
    /// The attack family that triggered escalation.
    pub pattern_type: ThreatFamily,
    /// Recognized context family.
    pub context_type: ContextType,
    /// Why this combination needs arbitration.
    pub reasoning: String,
}

/// Keyword-based context classifier.
pub struct ContextClassifier {
    ticket_reference: Regex,
}

impl ContextClassifier {
    pub fn new() -> Self {
        Self {
            ticket_reference: Regex::new(r"(?i)\b(?:ticket|order|case)\s*#\s*\d+").unwrap(),
        }
    }

    /// Classify the prompt's context. Educational wins over business.
    pub fn classify(&self, text: &str) -> Option<ContextType> {
        let lower = text.to_lowercase();

        if EDUCATIONAL_KEYWORDS.iter().any(|k| lower.contains(k)) {
            return Some(ContextType::Educational);
        }

        if self.ticket_reference.is_match(text) {
            return Some(ContextType::Business);
        }

        let distinct = BUSINESS_KEYWORDS
            .iter()
            .filter(|k| lower.contains(*k))
            .count();
        if distinct >= BUSINESS_KEYWORD_THRESHOLD {
            return Some(ContextType::Business);
        }

        None
    }
}

impl Default for ContextClassifier {
    fn default() -> Self {
        Self::new()
    }
}
