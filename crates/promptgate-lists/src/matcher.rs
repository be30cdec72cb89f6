//! Case-insensitive phrase matching against merged lists.

use serde::{Deserialize, Serialize};

/// Which list produced the match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListMatchKind {
    Blacklist,
    Whitelist,
}

/// A phrase match against the merged lists.
///
/// At most one is produced per call: the blacklist is scanned first in list
/// order and the first substring match returns immediately, so a blacklist
/// match wins over any simultaneous whitelist match regardless of where the
/// phrases appear in the text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListMatch {
    pub kind: ListMatchKind,
    /// The phrase that matched, as stored in the list.
    pub matched_phrase: String,
    /// 0.9 for blacklist, 0.8 for whitelist.
    pub confidence: f64,
    /// Attribution label: `custom_blacklist` or `custom_whitelist`.
    pub source: String,
}

/// Confidence assigned to a blacklist match (strong attack signal).
const BLACKLIST_CONFIDENCE: f64 = 0.9;
/// Confidence assigned to a whitelist match (strong business signal).
const WHITELIST_CONFIDENCE: f64 = 0.8;

/// Check a prompt against merged whitelist/blacklist phrases.
///
/// Returns `None` when neither list matches. Both the prompt and the
/// phrases are compared lowercased; the lists are expected to arrive
/// already validated (see the sanitizer) but are lowercased defensively
/// here since matching is cheap.
pub fn check_lists(prompt: &str, whitelist: &[String], blacklist: &[String]) -> Option<ListMatch> {
    if prompt.is_empty() {
        return None;
    }

    let normalized = prompt.to_lowercase();

    for phrase in blacklist {
        if !phrase.is_empty() && normalized.contains(&phrase.to_lowercase()) {
            return Some(ListMatch {
                kind: ListMatchKind::Blacklist,
                matched_phrase: phrase.clone(),
                confidence: BLACKLIST_CONFIDENCE,
                source: "custom_blacklist".to_string(),
            });
        }
    }

    for phrase in whitelist {
        if !phrase.is_empty() && normalized.contains(&phrase.to_lowercase()) {
            return Some(ListMatch {
                kind: ListMatchKind::Whitelist,
                matched_phrase: phrase.clone(),
                confidence: WHITELIST_CONFIDENCE,
                source: "custom_whitelist".to_string(),
            });
        }
    }

    None
}
