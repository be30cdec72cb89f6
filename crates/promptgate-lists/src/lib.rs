//! # Custom Lists
//!
//! Tier-scoped whitelist/blacklist phrase matching and the machinery around
//! it: stock default lists, profile-aware merging, tier limit enforcement,
//! and the write-time phrase sanitizer.
//!
//! Matching itself is a case-insensitive substring scan. A blacklist match
//! (confidence 0.9) strictly dominates a whitelist match (0.8): the
//! blacklist is always scanned first and the first match wins. Matches are
//! routing signals, not unconditional decisions — in particular a whitelist
//! match can never override pattern detection.
//!
//! Limits and phrase hygiene are enforced when lists are edited or
//! submitted, never at match time.

mod defaults;
mod matcher;
mod merge;
mod sanitize;
mod tier;

pub use defaults::{DEFAULT_BLACKLIST, DEFAULT_WHITELIST};
pub use matcher::{check_lists, ListMatch, ListMatchKind};
pub use merge::{effective_lists, CustomRules, EffectiveLists, ListSources, ProfileLists};
pub use sanitize::{sanitize_phrase, sanitize_rules, SanitizeError, SanitizedPhrase};
pub use tier::{Tier, TierLimits, TierViolation};
