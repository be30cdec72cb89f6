//! The final validation decision and its stage attribution.

use serde::{Deserialize, Serialize};

use promptgate_lists::{CustomRules, ListMatch, ProfileLists, Tier};

/// Pipeline phase that produced the terminal verdict.
///
/// The stage fully determines which sub-result decided. `PatternError` and
/// `Pass2Error` are part of the public vocabulary for decision consumers;
/// no current path emits them (deterministic stages cannot fail at runtime,
/// and Pass 2 failures surface as `Pass1Fallback`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Deterministic pattern/reference stage decided.
    Pattern,
    /// A custom blacklist phrase decided.
    CustomBlacklist,
    /// AI Pass 1 decided.
    Pass1,
    /// AI Pass 2 decided.
    Pass2,
    /// Pass 2 failed; Pass 1 verdict reused with degraded confidence.
    Pass1Fallback,
    /// Deterministic stage error terminal (reserved).
    PatternError,
    /// Pass 1 failed; fail-closed terminal.
    Pass1Error,
    /// Pass 2 error terminal (reserved).
    Pass2Error,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Pattern => "pattern",
            Stage::CustomBlacklist => "custom_blacklist",
            Stage::Pass1 => "pass1",
            Stage::Pass2 => "pass2",
            Stage::Pass1Fallback => "pass1_fallback",
            Stage::PatternError => "pattern_error",
            Stage::Pass1Error => "pass1_error",
            Stage::Pass2Error => "pass2_error",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Options accompanying one validation call.
#[derive(Debug, Clone, Default)]
pub struct ValidationOptions {
    /// Plan tier; gates custom-rule quotas.
    pub tier: Tier,
    /// Request-level custom rules.
    pub custom_rules: Option<CustomRules>,
    /// Stored profile list configuration.
    pub profile: Option<ProfileLists>,
    /// Tenant identifier used for cache scoping; anonymous when absent.
    pub tenant: Option<String>,
}

/// The final decision for one prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationDecision {
    /// Whether the prompt may proceed downstream.
    pub safe: bool,
    /// Decision confidence in [0, 1]. Deterministic verdicts use attack
    /// evidence (0.0 = clean input); AI verdicts are clamped to
    /// [0.01, 0.99].
    pub confidence: f64,
    /// Threat taxonomy labels, empty when safe.
    pub threats: Vec<String>,
    /// Which stage decided.
    pub stage: Stage,
    /// Human-readable explanation.
    pub reasoning: String,
    /// Accumulated AI spend in USD; 0 for deterministic terminals.
    pub cost: f64,
    /// Wall-clock processing time in milliseconds.
    pub processing_time_ms: u64,
    /// True when the decision was produced by a degraded or failed path and
    /// should be queued for human or secondary audit.
    pub needs_review: bool,
    /// Custom list match, attached whether or not it decided.
    pub custom_rule_matched: Option<ListMatch>,
    /// Whether external references were present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_references: Option<bool>,
    /// Model that produced an AI verdict.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Unique id for audit correlation.
    pub decision_id: String,
    /// Stage-specific detection metadata.
    pub metadata: serde_json::Value,
}

impl ValidationDecision {
    /// True when this decision came from an error terminal.
    pub fn is_error_terminal(&self) -> bool {
        matches!(
            self.stage,
            Stage::PatternError | Stage::Pass1Error | Stage::Pass2Error
        )
    }
}
