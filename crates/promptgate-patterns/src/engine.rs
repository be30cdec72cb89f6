//! The unified pattern engine and its decision table.

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

use crate::context::{ContextClassifier, ContextSignal, ContextType};
use crate::families::{has_repetition, FamilyPatterns, ThreatFamily};
use crate::verdict::{PatternMetadata, PatternVerdict, ThreatLabel};
use promptgate_references::{ReferenceDetector, ReferenceReport};

/// Deterministic pattern engine.
///
/// Stateless by construction: all patterns are compiled once, `detect`
/// borrows immutably, and no match state survives a call — concurrent and
/// sequential invocations are never affected by prior calls.
///
/// Decision table (first matching rule wins):
/// 1. Jailbreak or repetition pattern → terminal unsafe, no context applies.
/// 2. Encoded/obfuscated external reference → terminal unsafe.
/// 3. Sensitive file path, or action verb aimed at a reference → terminal unsafe.
/// 4. Attack family + context signal → provisional safe, `requires_ai`.
/// 5. Attack family, no context → terminal unsafe.
/// 6. Bare external reference, no action → terminal safe, reduced confidence.
/// 7. Nothing matched → terminal safe, zero attack evidence.
pub struct PatternEngine {
    families: FamilyPatterns,
    context: ContextClassifier,
    references: ReferenceDetector,
    actions: Vec<Regex>,
    sensitive_paths: Vec<Regex>,
}

impl PatternEngine {
    pub fn new() -> Self {
        let compile = |patterns: &[&str]| -> Vec<Regex> {
            patterns.iter().map(|p| Regex::new(p).unwrap()).collect()
        };

        Self {
            families: FamilyPatterns::new(),
            context: ContextClassifier::new(),
            references: ReferenceDetector::new(),
            actions: compile(&[
                r"(?i)\bvisit\s+(the|this|it|that|https?|www\.|ftp)",
                r"(?i)\bcheck\s+out\s+(the|this|it|that|https?|www\.|ftp)",
                r"(?i)\baccess\s+(the|this|it|that|https?|www\.|ftp)",
                r"(?i)\bgo\s+to\s+(the|this|it|that|https?|www\.|ftp)",
                r"(?i)\bfetch\s+(the|this|it|that|from|https?|www\.|ftp)",
                r"(?i)\bnavigate\s+(to|the|this)",
                r"(?i)\bopen\s+(the|this|it|that|https?|www\.|ftp)",
                r"(?i)\bbrowse\s+(to|the|this|https?|www\.|ftp)",
                r"(?i)\bclick\s+(on|the|this)",
                r"(?i)\bfollow\s+(the|this|it|that)",
                r"(?i)\bsee\s+what\b",
                r"(?i)\blook\s+at\s+(the|this|it|that|https?|www\.|ftp)",
                r"(?i)\btell\s+me\s+what\b",
                r"(?i)\breview\s+(the|this|it|that|https?|www\.|ftp)",
                r"(?i)\bload\s+(the|this|it|that|from|https?|www\.|ftp)",
                r"(?i)\bretrieve\s+(the|this|it|that|from|https?|www\.|ftp)",
            ]),
            sensitive_paths: compile(&[
                r"(?i)/etc/passwd",
                r"(?i)/etc/shadow",
                r"(?i)/etc/sudoers",
                r"(?i)/root/",
                r"(?i)\.ssh/id_rsa",
                r"(?i)\.aws/credentials",
                r"(?i)\.env\b",
            ]),
        }
    }

    /// Run the full deterministic analysis over one prompt.
    pub fn detect(&self, prompt: &str) -> PatternVerdict {
        // Canonical Unicode form before any matching.
        let text: String = prompt.nfkc().collect();

        // 1. Jailbreak and repetition are terminal regardless of context.
        if self.families.is_jailbreak(&text) {
            tracing::debug!("jailbreak pattern matched");
            return block(
                0.95,
                ThreatLabel::JailbreakAttempt,
                "Jailbreak pattern detected (DAN, STAN, AIM, or multi-language bypass attempt)",
                PatternMetadata {
                    stage: "pattern_unified".to_string(),
                    detected_patterns: vec!["jailbreak".to_string()],
                    ..Default::default()
                },
            );
        }

        if has_repetition(&text) {
            return block(
                0.92,
                ThreatLabel::FilterBypass,
                "Repetition/padding pattern detected (filter bypass attempt)",
                PatternMetadata {
                    stage: "pattern_unified".to_string(),
                    detected_patterns: vec!["repetition".to_string()],
                    ..Default::default()
                },
            );
        }

        // 2-3. External reference escalation.
        let refs = self.references.detect(&text);
        if refs.has_external_references {
            if let Some(verdict) = self.classify_references(&text, &refs) {
                return verdict;
            }
        }

        // 4-5. Attack families, with or without context.
        let detected = self.families.detect_families(&text);
        if !detected.is_empty() {
            let primary = detected[0];
            let detected_names: Vec<String> =
                detected.iter().map(|f| f.as_str().to_string()).collect();

            if let Some(context_type) = self.context.classify(&text) {
                return self.suspicious(primary, context_type, detected_names);
            }

            return block(
                family_confidence(primary),
                family_threat(primary),
                family_reasoning(primary),
                PatternMetadata {
                    stage: "pattern_unified".to_string(),
                    detected_patterns: detected_names,
                    ..Default::default()
                },
            );
        }

        // 6. Bare reference with no action verb: allow with reduced confidence.
        if refs.has_external_references {
            let references = extract_references(&refs);
            return PatternVerdict {
                safe: true,
                confidence: 0.70,
                threats: Vec::new(),
                requires_ai: false,
                context: None,
                reasoning: "External reference detected - content cannot be validated. \
                            Allowed with warning for downstream handling."
                    .to_string(),
                metadata: PatternMetadata {
                    stage: "external_reference".to_string(),
                    external_references: true,
                    reference_kinds: refs.kinds.clone(),
                    references,
                    ..Default::default()
                },
            };
        }

        // 7. Clean.
        PatternVerdict {
            safe: true,
            confidence: 0.0,
            threats: Vec::new(),
            requires_ai: false,
            context: None,
            reasoning: "No malicious patterns detected".to_string(),
            metadata: PatternMetadata {
                stage: "pattern_unified".to_string(),
                ..Default::default()
            },
        }
    }

    /// Terminal classification for reference findings, if any applies.
    fn classify_references(&self, text: &str, refs: &ReferenceReport) -> Option<PatternVerdict> {
        let encoded = refs.has_encoded_reference();

        if encoded || refs.obfuscation_detected {
            let (threat, reasoning) = if encoded {
                let kind = refs
                    .kinds
                    .iter()
                    .find(|k| k.is_encoded())
                    .map(|k| k.as_str().replace('_', " ").to_uppercase())
                    .unwrap_or_default();
                (
                    ThreatLabel::EncodedReference,
                    format!("{} detected - likely evasion attempt", kind),
                )
            } else {
                (
                    ThreatLabel::ObfuscatedReference,
                    "Obfuscation detected (spaced URLs, defanged notation) - blocked as suspicious"
                        .to_string(),
                )
            };

            return Some(PatternVerdict {
                safe: false,
                confidence: 0.90,
                threats: vec![threat],
                requires_ai: false,
                context: None,
                reasoning,
                metadata: PatternMetadata {
                    stage: "external_reference".to_string(),
                    external_references: true,
                    reference_kinds: refs.kinds.clone(),
                    ..Default::default()
                },
            });
        }

        let has_sensitive_path = refs.has_kind(promptgate_references::ReferenceKind::Files)
            && self.sensitive_paths.iter().any(|p| p.is_match(text));
        let has_action = self.actions.iter().any(|p| p.is_match(text));

        if has_sensitive_path || has_action {
            let (confidence, threat, reasoning) = if has_sensitive_path {
                (
                    0.95,
                    ThreatLabel::SensitiveFileReference,
                    "Sensitive file path detected (e.g., /etc/passwd, credentials, private keys)",
                )
            } else {
                (
                    0.85,
                    ThreatLabel::ExternalReferenceExecution,
                    "Action + external reference detected - potential data exfiltration or execution",
                )
            };

            return Some(PatternVerdict {
                safe: false,
                confidence,
                threats: vec![threat],
                requires_ai: false,
                context: None,
                reasoning: reasoning.to_string(),
                metadata: PatternMetadata {
                    stage: "external_reference".to_string(),
                    external_references: true,
                    reference_kinds: refs.kinds.clone(),
                    ..Default::default()
                },
            });
        }

        // Plain reference: deferred to the attack-family rules, then rule 6.
        None
    }

    fn suspicious(
        &self,
        primary: ThreatFamily,
        context_type: ContextType,
        detected_names: Vec<String>,
    ) -> PatternVerdict {
        let upper = primary.as_str().to_uppercase();
        let context_reasoning = format!(
            "{} patterns detected with {} context - requires AI analysis to distinguish \
             legitimate discussion from attack",
            upper, context_type
        );

        PatternVerdict {
            safe: true,
            confidence: 0.65,
            threats: Vec::new(),
            requires_ai: true,
            context: Some(ContextSignal {
                detected: true,
                pattern_type: primary,
                context_type,
                reasoning: context_reasoning,
            }),
            reasoning: format!(
                "{} patterns detected with {} context - flagged as SUSPICIOUS, requires AI validation",
                upper, context_type
            ),
            metadata: PatternMetadata {
                stage: "pattern_unified".to_string(),
                detected_patterns: detected_names,
                context_type: Some(context_type.as_str().to_string()),
                ..Default::default()
            },
        }
    }
}

impl Default for PatternEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn block(
    confidence: f64,
    threat: ThreatLabel,
    reasoning: &str,
    metadata: PatternMetadata,
) -> PatternVerdict {
    PatternVerdict {
        safe: false,
        confidence,
        threats: vec![threat],
        requires_ai: false,
        context: None,
        reasoning: reasoning.to_string(),
        metadata,
    }
}

fn family_confidence(family: ThreatFamily) -> f64 {
    match family {
        ThreatFamily::Xss | ThreatFamily::Sql | ThreatFamily::Command => 0.95,
        ThreatFamily::Execution => 0.92,
        ThreatFamily::Template | ThreatFamily::Semantic => 0.90,
    }
}

fn family_threat(family: ThreatFamily) -> ThreatLabel {
    match family {
        ThreatFamily::Xss => ThreatLabel::XssAttack,
        ThreatFamily::Sql => ThreatLabel::SqlInjection,
        ThreatFamily::Template => ThreatLabel::TemplateInjection,
        ThreatFamily::Command => ThreatLabel::CommandInjection,
        ThreatFamily::Semantic => ThreatLabel::SemanticExtraction,
        ThreatFamily::Execution => ThreatLabel::ExecutionCommand,
    }
}

fn family_reasoning(family: ThreatFamily) -> &'static str {
    match family {
        ThreatFamily::Xss => "XSS attack pattern detected (script execution attempt)",
        ThreatFamily::Sql => "SQL injection pattern detected (database manipulation attempt)",
        ThreatFamily::Template => {
            "Template injection pattern detected (server-side code execution attempt)"
        }
        ThreatFamily::Command => {
            "Command injection pattern detected (system command execution attempt)"
        }
        ThreatFamily::Semantic => {
            "Semantic extraction pattern detected (indirect information retrieval via riddles, \
             rhymes, or definitions)"
        }
        ThreatFamily::Execution => {
            "Execution command pattern detected (fetch/decode and execute instructions)"
        }
    }
}

fn extract_references(refs: &ReferenceReport) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for detail in &refs.details {
        let value = detail
            .matched
            .clone()
            .or_else(|| detail.decoded.clone())
            .unwrap_or_else(|| "unknown".to_string());
        if !out.contains(&value) {
            out.push(value);
        }
        if out.len() == 5 {
            break;
        }
    }
    out
}
