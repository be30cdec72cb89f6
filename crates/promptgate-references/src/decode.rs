//! Recursive decoding of encoded references.
//!
//! Attackers wrap URLs and IPs in Base64, hex, or ROT13 to slip them past
//! literal matchers, and sometimes nest encodings several layers deep. This
//! module scans for candidate tokens and decodes them recursively, checking
//! at every level whether the plaintext looks like a URL or IP address.
//!
//! ## Depth limit
//!
//! Decoding stops at [`MAX_DECODE_DEPTH`] nested levels. The value is an
//! empirically chosen constant carried over from production traffic analysis
//! with no documented derivation; it is exposed as a named constant rather
//! than re-derived.
//!
//! ## Candidate heuristics
//!
//! - Base64: runs of `[A-Za-z0-9+/]` at least 30 characters long with up to
//!   two `=` pads. The length floor keeps ordinary words from being decoded.
//! - Hex: runs of at least 8 hex digits, optionally `0x`-prefixed.
//! - ROT13: a single whole-text pass; ROT13 nests pointlessly so one level
//!   is enough.

use base64::Engine;
use regex::Regex;

use crate::matchers::ReferenceKind;

/// Maximum number of nested decode levels attempted for Base64/hex tokens.
pub const MAX_DECODE_DEPTH: u8 = 7;

/// Minimum length for a Base64 candidate token.
const BASE64_MIN_LEN: usize = 30;

/// A successfully decoded reference.
#[derive(Debug, Clone)]
pub struct EncodedFinding {
    /// Which encoding the outermost token used.
    pub kind: ReferenceKind,
    /// The encoded token (truncated for reporting).
    pub encoded: String,
    /// The fully decoded plaintext.
    pub decoded: String,
    /// Nesting level at which the reference surfaced (1 = not nested).
    pub depth: u8,
}

/// Scanner for Base64/hex-encoded references.
pub struct EncodedScanner {
    base64_token: Regex,
    hex_token: Regex,
}

impl EncodedScanner {
    pub fn new() -> Self {
        Self {
            base64_token: Regex::new(r"[A-Za-z0-9+/]{30,}={0,2}").unwrap(),
            hex_token: Regex::new(r"(?i)(?:0x)?[0-9a-f]{8,}").unwrap(),
        }
    }

    /// Scan `text` for encoded tokens that decode (possibly through nested
    /// layers) to something URL- or IP-shaped.
    pub fn scan(&self, text: &str) -> Vec<EncodedFinding> {
        let mut findings = Vec::new();
        self.scan_level(text, 1, &mut findings);
        findings
    }

    fn scan_level(&self, text: &str, depth: u8, findings: &mut Vec<EncodedFinding>) {
        if depth > MAX_DECODE_DEPTH {
            return;
        }

        for m in self.base64_token.find_iter(text) {
            let token = m.as_str();
            if token.len() < BASE64_MIN_LEN {
                continue;
            }
            if let Some(decoded) = decode_base64(token) {
                self.record_or_recurse(ReferenceKind::Base64Encoded, token, decoded, depth, findings);
            }
        }

        for m in self.hex_token.find_iter(text) {
            let cleaned = m.as_str().trim_start_matches("0x").trim_start_matches("0X");
            if let Some(decoded) = decode_hex(cleaned) {
                self.record_or_recurse(ReferenceKind::HexEncoded, m.as_str(), decoded, depth, findings);
            }
        }
    }

    fn record_or_recurse(
        &self,
        kind: ReferenceKind,
        token: &str,
        decoded: String,
        depth: u8,
        findings: &mut Vec<EncodedFinding>,
    ) {
        if looks_like_url(&decoded) || looks_like_ip(&decoded) {
            tracing::debug!(kind = kind.as_str(), depth, "encoded reference decoded");
            findings.push(EncodedFinding {
                kind,
                encoded: truncate(token, 50),
                decoded,
                depth,
            });
        } else {
            // Not a reference at this level; the payload may be wrapped again.
            self.scan_level(&decoded, depth + 1, findings);
        }
    }
}

impl Default for EncodedScanner {
    fn default() -> Self {
        Self::new()
    }
}

fn decode_base64(token: &str) -> Option<String> {
    base64::engine::general_purpose::STANDARD
        .decode(token)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
}

fn decode_hex(token: &str) -> Option<String> {
    hex::decode(token)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
}

/// Apply ROT13 to every ASCII letter.
pub fn rot13(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            'a'..='z' => (((c as u8 - b'a' + 13) % 26) + b'a') as char,
            'A'..='Z' => (((c as u8 - b'A' + 13) % 26) + b'A') as char,
            _ => c,
        })
        .collect()
}

/// Rough check that decoded plaintext is URL-shaped.
pub fn looks_like_url(text: &str) -> bool {
    if text.len() < 10 {
        return false;
    }
    text.starts_with("http://")
        || text.starts_with("https://")
        || text.starts_with("www.")
        || text.starts_with("ftp://")
        || [".com", ".org", ".net", ".io", ".dev", ".app"]
            .iter()
            .any(|tld| text.contains(tld))
}

/// Rough check that decoded plaintext is IP-shaped.
pub fn looks_like_ip(text: &str) -> bool {
    if text.len() < 7 {
        return false;
    }
    static IPV4: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    static IPV6: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    let v4 = IPV4.get_or_init(|| Regex::new(r"\b(?:\d{1,3}\.){3}\d{1,3}\b").unwrap());
    let v6 = IPV6.get_or_init(|| Regex::new(r"(?i)\b(?:[a-f0-9]{1,4}:){2,7}[a-f0-9]{1,4}\b").unwrap());
    v4.is_match(text) || v6.is_match(text)
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() > max {
        format!("{}...", &s[..max])
    } else {
        s.to_string()
    }
}
