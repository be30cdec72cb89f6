//! Reference-type matchers for normalized text.

use regex::Regex;
use serde::{Deserialize, Serialize};

/// The kind of external reference that was matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    /// URL or domain reference.
    Urls,
    /// IPv4 or IPv6 address.
    Ips,
    /// File path (Unix, Windows, UNC, traversal).
    Files,
    /// Fetch-style command phrased before a reference.
    Commands,
    /// Reference revealed by ROT13 decoding.
    Rot13Encoded,
    /// Reference revealed by Base64 decoding.
    Base64Encoded,
    /// Reference revealed by hex decoding.
    HexEncoded,
}

impl ReferenceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReferenceKind::Urls => "urls",
            ReferenceKind::Ips => "ips",
            ReferenceKind::Files => "files",
            ReferenceKind::Commands => "commands",
            ReferenceKind::Rot13Encoded => "rot13_encoded",
            ReferenceKind::Base64Encoded => "base64_encoded",
            ReferenceKind::HexEncoded => "hex_encoded",
        }
    }

    /// True for kinds produced by a decoder rather than a literal match.
    pub fn is_encoded(&self) -> bool {
        matches!(
            self,
            ReferenceKind::Rot13Encoded | ReferenceKind::Base64Encoded | ReferenceKind::HexEncoded
        )
    }
}

impl std::fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Compiled pattern tables for each literal reference kind.
pub struct ReferenceMatchers {
    urls: Vec<Regex>,
    ips: Vec<Regex>,
    files: Vec<Regex>,
    commands: Vec<Regex>,
}

impl ReferenceMatchers {
    pub fn new() -> Self {
        let compile = |patterns: &[&str]| -> Vec<Regex> {
            patterns.iter().map(|p| Regex::new(p).unwrap()).collect()
        };

        Self {
            urls: compile(&[
                // Protocol URLs
                r#"(?i)https?://[^\s<>"{}|\\^`\[\]]+"#,
                r#"(?i)(?:ftp|file|ssh|telnet|vnc|rdp)://[^\s<>"{}|\\^`\[\]]+"#,
                // www without protocol
                r#"(?i)www\.[a-z0-9][a-z0-9-]*[a-z0-9]\.[^\s<>"{}|\\^`\[\]]+"#,
                // Bare domains with known TLDs
                r#"(?i)[a-z0-9][a-z0-9-]*[a-z0-9]\.(?:com|org|net|io|dev|app|ai|cloud|xyz|edu|gov|mil|biz|info|name|museum|us|ca|uk|de|jp|fr|au|ru|ch|it|nl|se|no|es)[^\s<>"{}|\\^`\[\]]*"#,
                // Domain + path without protocol
                r"(?i)[a-z0-9-]+\.[a-z]{2,}/[\w\-._~:/?#\[\]@!$&'()*+,;=]+",
                // Shortened URLs
                r"(?i)(?:bit\.ly|tinyurl\.com|goo\.gl|t\.co|short\.link|tiny\.cc|ow\.ly|is\.gd|buff\.ly)/[a-z0-9]+",
                // Markdown / HTML link syntax
                r"\[[^\]]+\]\([^)]+\)",
                r#"(?i)<a[^>]*href=['"][^'"]+['"]"#,
                // Loopback
                r"(?i)localhost(?::[0-9]{1,5})?",
                r"127\.0\.0\.1(?::[0-9]{1,5})?",
            ]),
            ips: compile(&[
                // IPv4, optionally with port
                r"\b(?:(?:25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)\.){3}(?:25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)\b",
                r"\b(?:(?:25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)\.){3}(?:25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?):[0-9]{1,5}\b",
                // IPv6 full and compressed
                r"(?i)\b(?:[a-f0-9]{1,4}:){7}[a-f0-9]{1,4}\b",
                r"(?i)\b(?:[a-f0-9]{1,4}:)+:(?:[a-f0-9]{1,4}:)*[a-f0-9]{1,4}\b",
                // IPv6 with port
                r"(?i)\[(?:[a-f0-9]{1,4}:)*:?(?:[a-f0-9]{1,4}:)*[a-f0-9]{1,4}\]:[0-9]{1,5}",
            ]),
            files: compile(&[
                // Unix absolute paths under sensitive roots
                r"/(?:home|usr|var|etc|tmp|opt|bin|sbin|lib|mnt|media|root|boot|dev|proc|sys)/[\w\-./]+",
                // Windows drive paths
                r"(?i)[a-z]:\\(?:[\w\-. ]+\\)*[\w\-. ]+",
                // UNC paths
                r"\\\\[\w\-.]+\\[\w\-. \\$]+",
                // file:// URLs
                r"(?i)file:///?\S+",
                // Traversal
                r"\.\./[\w\-./]+",
            ]),
            commands: compile(&[
                // Fetch verbs immediately before a reference-shaped target
                r#"(?i)\b(?:fetch|get|read|load|retrieve|download|curl|wget|request|pull|grab)\s+(?:from\s+)?['"]?(?:https?://|www\.|ftp://|[a-z0-9-]+\.[a-z]{2,}[/\s]|/[\w\-.]+/|\.\./)\S*"#,
                // Navigation verbs
                r#"(?i)\b(?:navigate|go|visit|open|browse|access|surf)\s+(?:to\s+)?['"]?(?:https?://|www\.|ftp://|[a-z0-9-]+\.[a-z]{2,}\S*)"#,
                // Follow/click a link
                r"(?i)\b(?:follow|click)\s+(?:this\s+)?(?:link|url|address)[:>\s]+\S+",
                // Check/look/see at a location
                r"(?i)\b(?:check|look|see)\s+(?:what's\s+)?(?:at|on)\s+(?:https?://|www\.|[a-z0-9-]+\.[a-z]{2,}\S*)",
                // Import/include/require from an external source
                r#"(?i)\b(?:import|include|require|source)\s+(?:from\s+)?['"]?(?:https?://|www\.|[a-z0-9-]+\.[a-z]{2,}/\S*)"#,
            ]),
        }
    }

    /// Match all reference kinds in `text`, returning deduplicated
    /// (kind, matched text) pairs in table order.
    pub fn find_all(&self, text: &str) -> Vec<(ReferenceKind, String)> {
        let mut out: Vec<(ReferenceKind, String)> = Vec::new();
        for (kind, table) in self.tables() {
            for pattern in table {
                for m in pattern.find_iter(text) {
                    let matched = m.as_str().to_string();
                    if !out.iter().any(|(k, s)| *k == kind && *s == matched) {
                        out.push((kind, matched));
                    }
                }
            }
        }
        out
    }

    /// True if any reference kind matches `text`.
    pub fn any_match(&self, text: &str) -> bool {
        self.tables()
            .iter()
            .any(|(_, table)| table.iter().any(|p| p.is_match(text)))
    }

    fn tables(&self) -> [(ReferenceKind, &[Regex]); 4] {
        [
            (ReferenceKind::Urls, self.urls.as_slice()),
            (ReferenceKind::Ips, self.ips.as_slice()),
            (ReferenceKind::Files, self.files.as_slice()),
            (ReferenceKind::Commands, self.commands.as_slice()),
        ]
    }
}

impl Default for ReferenceMatchers {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(text: &str) -> Vec<ReferenceKind> {
        let m = ReferenceMatchers::new();
        let mut found: Vec<ReferenceKind> = m.find_all(text).into_iter().map(|(k, _)| k).collect();
        found.dedup();
        found
    }

    #[test]
    fn test_protocol_url_matched() {
        assert!(kinds("see https://example.com/page").contains(&ReferenceKind::Urls));
    }

    #[test]
    fn test_bare_domain_matched() {
        assert!(kinds("the docs live at example.io somewhere").contains(&ReferenceKind::Urls));
    }

    #[test]
    fn test_shortener_matched() {
        assert!(kinds("bit.ly/3xyzabc").contains(&ReferenceKind::Urls));
    }

    #[test]
    fn test_markdown_link_matched() {
        assert!(kinds("[click here](https://evil.test)").contains(&ReferenceKind::Urls));
    }

    #[test]
    fn test_localhost_matched() {
        assert!(kinds("connect to localhost:8080 now").contains(&ReferenceKind::Urls));
    }

    #[test]
    fn test_ipv4_matched() {
        assert!(kinds("ping 203.0.113.7 for me").contains(&ReferenceKind::Ips));
    }

    #[test]
    fn test_ipv4_with_port_matched() {
        assert!(kinds("server at 10.0.0.1:9000").contains(&ReferenceKind::Ips));
    }

    #[test]
    fn test_ipv6_matched() {
        assert!(kinds("addr 2001:0db8:85a3:0000:0000:8a2e:0370:7334").contains(&ReferenceKind::Ips));
    }

    #[test]
    fn test_unix_sensitive_path_matched() {
        assert!(kinds("cat /etc/passwd please").contains(&ReferenceKind::Files));
    }

    #[test]
    fn test_windows_path_matched() {
        assert!(kinds(r"open C:\Users\admin\secrets.txt").contains(&ReferenceKind::Files));
    }

    #[test]
    fn test_traversal_matched() {
        assert!(kinds("read ../../etc/shadow now").contains(&ReferenceKind::Files));
    }

    #[test]
    fn test_fetch_command_matched() {
        assert!(kinds("fetch https://evil.test/payload and summarize").contains(&ReferenceKind::Commands));
    }

    #[test]
    fn test_navigate_command_matched() {
        assert!(kinds("navigate to www.evil.test").contains(&ReferenceKind::Commands));
    }

    #[test]
    fn test_plain_verb_without_reference_not_a_command() {
        // "get" with a non-reference object must not count as a fetch command
        assert!(!kinds("get the meeting notes ready").contains(&ReferenceKind::Commands));
    }

    #[test]
    fn test_clean_text_matches_nothing() {
        let m = ReferenceMatchers::new();
        assert!(m.find_all("summarize the attached quarterly budget").is_empty());
    }
}
