//! Plan tiers and custom-rule quotas.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Subscription tier, as named by the billing layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    #[default]
    Free,
    Starter,
    Business,
    Enterprise,
    Internal,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Free => "free",
            Tier::Starter => "starter",
            Tier::Business => "business",
            Tier::Enterprise => "enterprise",
            Tier::Internal => "internal",
        }
    }

    pub fn limits(&self) -> TierLimits {
        match self {
            Tier::Free => TierLimits {
                custom_rules_enabled: false,
                can_edit_defaults: false,
                max_custom_whitelist: 0,
                max_custom_blacklist: 0,
            },
            Tier::Starter => TierLimits {
                custom_rules_enabled: true,
                can_edit_defaults: true,
                max_custom_whitelist: 25,
                max_custom_blacklist: 25,
            },
            Tier::Business => TierLimits {
                custom_rules_enabled: true,
                can_edit_defaults: true,
                max_custom_whitelist: 100,
                max_custom_blacklist: 100,
            },
            Tier::Enterprise | Tier::Internal => TierLimits {
                custom_rules_enabled: true,
                can_edit_defaults: true,
                max_custom_whitelist: 200,
                max_custom_blacklist: 200,
            },
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Quotas attached to a tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierLimits {
    /// Whether the tier may submit custom rules at all.
    pub custom_rules_enabled: bool,
    /// Whether default phrases may be removed.
    pub can_edit_defaults: bool,
    pub max_custom_whitelist: usize,
    pub max_custom_blacklist: usize,
}

impl TierLimits {
    /// Validate submitted rule counts against this tier's quotas.
    ///
    /// Called before the pipeline runs; a violation is a caller-facing
    /// rejection, never a pipeline decision.
    pub fn validate(
        &self,
        tier: Tier,
        whitelist_count: usize,
        blacklist_count: usize,
    ) -> Result<(), TierViolation> {
        if !self.custom_rules_enabled && (whitelist_count > 0 || blacklist_count > 0) {
            return Err(TierViolation::RulesNotAvailable { tier });
        }
        if whitelist_count > self.max_custom_whitelist {
            return Err(TierViolation::WhitelistOverLimit {
                tier,
                count: whitelist_count,
                limit: self.max_custom_whitelist,
            });
        }
        if blacklist_count > self.max_custom_blacklist {
            return Err(TierViolation::BlacklistOverLimit {
                tier,
                count: blacklist_count,
                limit: self.max_custom_blacklist,
            });
        }
        Ok(())
    }
}

/// Custom-rule quota violations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TierViolation {
    #[error("custom rules not available on {tier} tier; upgrade to starter or higher")]
    RulesNotAvailable { tier: Tier },

    #[error("whitelist exceeds limit: {count}/{limit} for {tier} tier")]
    WhitelistOverLimit { tier: Tier, count: usize, limit: usize },

    #[error("blacklist exceeds limit: {count}/{limit} for {tier} tier")]
    BlacklistOverLimit { tier: Tier, count: usize, limit: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_free_tier_rejects_custom_rules() {
        let err = Tier::Free.limits().validate(Tier::Free, 1, 0).unwrap_err();
        assert!(matches!(err, TierViolation::RulesNotAvailable { .. }));
    }

    #[test]
    fn test_free_tier_allows_empty_rules() {
        assert!(Tier::Free.limits().validate(Tier::Free, 0, 0).is_ok());
    }

    #[test]
    fn test_starter_within_limits() {
        assert!(Tier::Starter.limits().validate(Tier::Starter, 25, 25).is_ok());
    }

    #[test]
    fn test_over_limit_message_carries_counts() {
        let err = Tier::Starter
            .limits()
            .validate(Tier::Starter, 10, 26)
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("26/25"), "message was: {msg}");
        assert!(msg.contains("starter"));
    }

    #[test]
    fn test_tier_serde_lowercase() {
        assert_eq!(serde_json::to_string(&Tier::Enterprise).unwrap(), "\"enterprise\"");
        let t: Tier = serde_json::from_str("\"internal\"").unwrap();
        assert_eq!(t, Tier::Internal);
    }
}
