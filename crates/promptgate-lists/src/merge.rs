//! Merging default, profile, and request-level lists.

use serde::{Deserialize, Serialize};

use crate::defaults::{DEFAULT_BLACKLIST, DEFAULT_WHITELIST};

/// Request-level custom rules, supplied per validation call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CustomRules {
    #[serde(default)]
    pub whitelist: Vec<String>,
    #[serde(default)]
    pub blacklist: Vec<String>,
}

/// Per-profile list configuration, as stored by the account layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileLists {
    #[serde(default)]
    pub custom_whitelist: Vec<String>,
    #[serde(default)]
    pub custom_blacklist: Vec<String>,
    /// Default phrases this profile has removed.
    #[serde(default)]
    pub removed_whitelist_defaults: Vec<String>,
    #[serde(default)]
    pub removed_blacklist_defaults: Vec<String>,
    /// Whether the stock lists are applied at all. Defaults to true.
    #[serde(default = "default_true")]
    pub uses_default_whitelist: bool,
    #[serde(default = "default_true")]
    pub uses_default_blacklist: bool,
}

fn default_true() -> bool {
    true
}

impl Default for ProfileLists {
    fn default() -> Self {
        Self {
            custom_whitelist: Vec::new(),
            custom_blacklist: Vec::new(),
            removed_whitelist_defaults: Vec::new(),
            removed_blacklist_defaults: Vec::new(),
            uses_default_whitelist: true,
            uses_default_blacklist: true,
        }
    }
}

/// How many phrases each source contributed, for attribution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListSources {
    pub defaults: usize,
    pub profile: usize,
    pub request: usize,
}

/// Merged, case-folded, deduplicated lists ready for matching.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EffectiveLists {
    pub whitelist: Vec<String>,
    pub blacklist: Vec<String>,
    pub sources: ListSources,
}

/// Merge defaults + profile + request lists.
///
/// Priority is additive, not overriding: defaults (minus the profile's
/// removals, gated by the `uses_default_*` flags), then profile phrases,
/// then request phrases. Everything is lowercased and deduplicated,
/// preserving first-occurrence order so list-order matching stays stable.
pub fn effective_lists(
    custom_rules: Option<&CustomRules>,
    profile: Option<&ProfileLists>,
) -> EffectiveLists {
    let mut out = EffectiveLists::default();

    let uses_default_wl = profile.map_or(true, |p| p.uses_default_whitelist);
    let uses_default_bl = profile.map_or(true, |p| p.uses_default_blacklist);

    if uses_default_wl {
        let removed: Vec<String> = profile
            .map(|p| p.removed_whitelist_defaults.iter().map(|s| s.to_lowercase()).collect())
            .unwrap_or_default();
        for phrase in DEFAULT_WHITELIST {
            if !removed.iter().any(|r| r == phrase) {
                out.whitelist.push(phrase.to_string());
                out.sources.defaults += 1;
            }
        }
    }
    if uses_default_bl {
        let removed: Vec<String> = profile
            .map(|p| p.removed_blacklist_defaults.iter().map(|s| s.to_lowercase()).collect())
            .unwrap_or_default();
        for phrase in DEFAULT_BLACKLIST {
            if !removed.iter().any(|r| r == phrase) {
                out.blacklist.push(phrase.to_string());
                out.sources.defaults += 1;
            }
        }
    }

    if let Some(p) = profile {
        out.sources.profile += append_folded(&mut out.whitelist, &p.custom_whitelist);
        out.sources.profile += append_folded(&mut out.blacklist, &p.custom_blacklist);
    }

    if let Some(r) = custom_rules {
        out.sources.request += append_folded(&mut out.whitelist, &r.whitelist);
        out.sources.request += append_folded(&mut out.blacklist, &r.blacklist);
    }

    out
}

/// Append lowercased phrases, skipping duplicates. Returns how many were
/// offered (for source attribution, matching the reference behavior of
/// counting contributions rather than survivors).
fn append_folded(target: &mut Vec<String>, phrases: &[String]) -> usize {
    for phrase in phrases {
        let folded = phrase.to_lowercase();
        if !folded.is_empty() && !target.contains(&folded) {
            target.push(folded);
        }
    }
    phrases.len()
}
