//! Configuration for the validation facade.

use promptgate_escalator::EscalatorConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Latency profile for a gate instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ValidationMode {
    /// Tight AI timeouts for latency-sensitive callers.
    Fast,
    /// Default timeouts.
    #[default]
    Standard,
}

impl ValidationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationMode::Fast => "fast",
            ValidationMode::Standard => "standard",
        }
    }

    /// Escalator profile for this mode.
    pub fn escalator_config(&self) -> EscalatorConfig {
        match self {
            ValidationMode::Fast => EscalatorConfig::fast(),
            ValidationMode::Standard => EscalatorConfig::default(),
        }
    }
}

/// Result cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub enabled: bool,
    /// Maximum cached decisions before LRU eviction.
    pub max_entries: usize,
    /// Entry time-to-live.
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: 1_000,
            ttl: Duration::from_secs(300),
        }
    }
}

/// Top-level gate configuration.
#[derive(Debug, Clone, Default)]
pub struct GateConfig {
    /// Latency profile; also part of the cache key.
    pub mode: ValidationMode,
    /// Input bounds.
    pub limits: LimitsConfig,
    /// Result cache.
    pub cache: CacheConfig,
    /// Completion API key; without one, AI escalation fails closed.
    pub api_key: Option<String>,
}

/// Input bounds enforced before the pipeline runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Maximum prompt length in bytes.
    pub max_prompt_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_prompt_bytes: 10_000,
        }
    }
}
