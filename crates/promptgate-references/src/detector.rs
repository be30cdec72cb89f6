//! Reference detection pipeline: normalize, decode, match, score.

use serde::{Deserialize, Serialize};

use crate::decode::{rot13, EncodedScanner};
use crate::matchers::{ReferenceKind, ReferenceMatchers};
use crate::normalize::Normalizer;

/// One matched or decoded reference, for reporting and audit trails.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchDetail {
    /// The reference kind.
    pub kind: ReferenceKind,
    /// Literal match text (absent for decoded findings), truncated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched: Option<String>,
    /// Encoded token that produced a decoded finding, truncated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encoded: Option<String>,
    /// Decoded plaintext for encoded findings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decoded: Option<String>,
    /// Nesting level for encoded findings (1 = not nested).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depth: Option<u8>,
}

/// Result of reference detection over one prompt.
///
/// `safety_confidence` uses the legacy safety scale: 1.0 means "certainly
/// safe, nothing found" and lower values mean less safe. This is the
/// *inverse* of the attack-evidence scale used by the pattern engine; the
/// conversion happens exactly once, where the engine folds this report into
/// its verdict.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceReport {
    /// Whether any external reference was found.
    pub has_external_references: bool,
    /// Safety confidence in [0, 1]; 1.0 = nothing found.
    pub safety_confidence: f64,
    /// Reference kinds present, in detection order.
    pub kinds: Vec<ReferenceKind>,
    /// Individual matches and decodes.
    pub details: Vec<MatchDetail>,
    /// Whether any normalization rewrite fired.
    pub obfuscation_detected: bool,
    /// The normalized text the matchers ran against.
    pub normalized_text: String,
    /// Ordered human-readable justifications.
    pub reasoning: Vec<String>,
}

impl ReferenceReport {
    /// True if any reference was revealed by a decoder.
    pub fn has_encoded_reference(&self) -> bool {
        self.kinds.iter().any(|k| k.is_encoded())
    }

    pub fn has_kind(&self, kind: ReferenceKind) -> bool {
        self.kinds.contains(&kind)
    }
}

/// Stateless external-reference detector.
///
/// Compiles all patterns once; `detect` borrows immutably, so one instance
/// serves concurrent callers and repeated calls on the same input return
/// identical results.
pub struct ReferenceDetector {
    normalizer: Normalizer,
    matchers: ReferenceMatchers,
    scanner: EncodedScanner,
}

/// Confidence cap when an encoded reference was decoded.
const CAP_ENCODED: f64 = 0.2;
/// Confidence cap when obfuscation rewrites fired.
const CAP_OBFUSCATED: f64 = 0.3;
/// Confidence cap for plain URLs and IPs.
const CAP_URL_IP: f64 = 0.5;
/// Confidence cap for fetch-style commands.
const CAP_COMMAND: f64 = 0.4;
/// Confidence cap for file path references.
const CAP_FILE: f64 = 0.6;

impl ReferenceDetector {
    pub fn new() -> Self {
        Self {
            normalizer: Normalizer::new(),
            matchers: ReferenceMatchers::new(),
            scanner: EncodedScanner::new(),
        }
    }

    /// Detect all external references in `text`.
    pub fn detect(&self, text: &str) -> ReferenceReport {
        let (normalized, obfuscated) = self.normalizer.normalize(text);

        let mut report = ReferenceReport {
            has_external_references: false,
            safety_confidence: 1.0,
            kinds: Vec::new(),
            details: Vec::new(),
            obfuscation_detected: obfuscated,
            normalized_text: normalized.clone(),
            reasoning: Vec::new(),
        };

        // ROT13: one pass over the whole text, then re-run the matchers.
        // Digits and punctuation survive ROT13, so a plain IP in the input
        // would also "match" after decoding; only count references the
        // decode actually revealed.
        let rot13_decoded = rot13(&normalized);
        if rot13_decoded != normalized
            && !self.matchers.any_match(&normalized)
            && self.matchers.any_match(&rot13_decoded)
        {
            report.has_external_references = true;
            report.obfuscation_detected = true;
            report.kinds.push(ReferenceKind::Rot13Encoded);
            report
                .reasoning
                .push("ROT13 encoded references detected - possible evasion attempt".to_string());
            report.details.push(MatchDetail {
                kind: ReferenceKind::Rot13Encoded,
                matched: None,
                encoded: None,
                decoded: Some(rot13_decoded),
                depth: Some(1),
            });
        }

        // Base64 / hex, recursively.
        for finding in self.scanner.scan(&normalized) {
            report.has_external_references = true;
            report.obfuscation_detected = true;
            if !report.kinds.contains(&finding.kind) {
                report.kinds.push(finding.kind);
                report.reasoning.push(format!(
                    "{} URL/IP detected - likely evasion attempt",
                    match finding.kind {
                        ReferenceKind::Base64Encoded => "Base64 encoded",
                        ReferenceKind::HexEncoded => "Hex encoded",
                        other => other.as_str(),
                    }
                ));
            }
            report.details.push(MatchDetail {
                kind: finding.kind,
                matched: None,
                encoded: Some(finding.encoded),
                decoded: Some(finding.decoded),
                depth: Some(finding.depth),
            });
        }

        // Literal matchers on the normalized text.
        for (kind, matched) in self.matchers.find_all(&normalized) {
            report.has_external_references = true;
            if !report.kinds.contains(&kind) {
                report.kinds.push(kind);
            }
            report.details.push(MatchDetail {
                kind,
                matched: Some(truncate(&matched, 100)),
                encoded: None,
                decoded: None,
                depth: None,
            });
        }

        if report.has_external_references {
            self.assign_confidence(&mut report);
        }

        report
    }

    /// Cap the safety confidence by the most severe category present.
    fn assign_confidence(&self, report: &mut ReferenceReport) {
        if report.obfuscation_detected {
            report.safety_confidence = report.safety_confidence.min(CAP_OBFUSCATED);
            report
                .reasoning
                .push("Obfuscation detected - cannot verify safety".to_string());
        }

        if report.has_encoded_reference() {
            report.safety_confidence = report.safety_confidence.min(CAP_ENCODED);
            report
                .reasoning
                .push("Encoded external references - high risk of evasion".to_string());
        } else if report.has_kind(ReferenceKind::Urls) || report.has_kind(ReferenceKind::Ips) {
            report.safety_confidence = report.safety_confidence.min(CAP_URL_IP);
            report
                .reasoning
                .push("Contains external URLs/IPs - cannot verify content".to_string());
        } else if report.has_kind(ReferenceKind::Commands) {
            report.safety_confidence = report.safety_confidence.min(CAP_COMMAND);
            report
                .reasoning
                .push("Contains commands to fetch external content".to_string());
        } else if report.has_kind(ReferenceKind::Files) {
            report.safety_confidence = report.safety_confidence.min(CAP_FILE);
            report
                .reasoning
                .push("Contains file path references".to_string());
        }

        report
            .reasoning
            .push("External content cannot be validated by PromptGate".to_string());
        report
            .reasoning
            .push("Manual review recommended before processing".to_string());
    }
}

impl Default for ReferenceDetector {
    fn default() -> Self {
        Self::new()
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() > max {
        let end = (0..=max).rev().find(|i| s.is_char_boundary(*i)).unwrap_or(0);
        s[..end].to_string()
    } else {
        s.to_string()
    }
}
