//! Pattern stage verdict types.

use serde::{Deserialize, Serialize};

use crate::context::ContextSignal;
use promptgate_references::ReferenceKind;

/// Threat labels emitted by the deterministic stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreatLabel {
    /// Named jailbreak, role override, or multi-language bypass phrasing.
    JailbreakAttempt,
    /// Long character/word runs used to flood filters.
    FilterBypass,
    /// Script execution attempt.
    XssAttack,
    /// Database manipulation attempt.
    SqlInjection,
    /// Server-side template evaluation attempt.
    TemplateInjection,
    /// Shell command execution attempt.
    CommandInjection,
    /// Indirect secret retrieval via riddles, rhymes, or definitions.
    SemanticExtraction,
    /// Fetch/decode-and-execute phrasing.
    ExecutionCommand,
    /// Base64/hex/ROT13-wrapped external reference.
    EncodedReference,
    /// Reference hidden behind spacing, brackets, or homoglyphs.
    ObfuscatedReference,
    /// Action verb aimed at an external reference.
    ExternalReferenceExecution,
    /// Reference to a credential or system file.
    SensitiveFileReference,
}

impl ThreatLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThreatLabel::JailbreakAttempt => "jailbreak_attempt",
            ThreatLabel::FilterBypass => "filter_bypass",
            ThreatLabel::XssAttack => "xss_attack",
            ThreatLabel::SqlInjection => "sql_injection",
            ThreatLabel::TemplateInjection => "template_injection",
            ThreatLabel::CommandInjection => "command_injection",
            ThreatLabel::SemanticExtraction => "semantic_extraction",
            ThreatLabel::ExecutionCommand => "execution_command",
            ThreatLabel::EncodedReference => "encoded_reference",
            ThreatLabel::ObfuscatedReference => "obfuscated_reference",
            ThreatLabel::ExternalReferenceExecution => "external_reference_execution",
            ThreatLabel::SensitiveFileReference => "sensitive_file_reference",
        }
    }
}

impl std::fmt::Display for ThreatLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Detection metadata attached to every pattern verdict.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PatternMetadata {
    /// Which sub-stage decided: `pattern_unified` or `external_reference`.
    pub stage: String,
    /// All attack families that matched (only the first is reported).
    pub detected_patterns: Vec<String>,
    /// Context type present, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_type: Option<String>,
    /// Whether external references were found.
    #[serde(default)]
    pub external_references: bool,
    /// Reference kinds present.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub reference_kinds: Vec<ReferenceKind>,
    /// Up to five extracted references for reporting.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub references: Vec<String>,
}

/// Verdict from the deterministic pattern stage.
///
/// `confidence` is attack evidence: 0.0 = none, 1.0 = certain attack.
///
/// Invariant: `requires_ai` is true if and only if `context` is populated —
/// both clean input and instantly blocked input carry `requires_ai = false`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternVerdict {
    /// Whether the prompt is safe (provisionally, when `requires_ai`).
    pub safe: bool,
    /// Attack-evidence confidence in [0, 1].
    pub confidence: f64,
    /// Threat labels; empty for safe and suspicious verdicts.
    pub threats: Vec<ThreatLabel>,
    /// Whether AI arbitration is required.
    pub requires_ai: bool,
    /// Context signal, populated exactly when `requires_ai`.
    pub context: Option<ContextSignal>,
    /// Human-readable explanation.
    pub reasoning: String,
    /// Detection metadata.
    pub metadata: PatternMetadata,
}

impl PatternVerdict {
    /// True when this verdict ends the pipeline (no AI stage needed).
    pub fn is_terminal(&self) -> bool {
        !self.requires_ai
    }
}
