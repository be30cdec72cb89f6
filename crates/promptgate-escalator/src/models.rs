//! Model fallback lists and escalator configuration.
//!
//! Fallback priority is configuration data, not code: the lists are built
//! once, passed into the escalator, and never mutated.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One model in a fallback chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSpec {
    /// Provider-qualified model name.
    pub name: String,
    /// Price per million tokens in USD; 0 for free-tier models.
    pub cost_per_million: f64,
    /// Position in the fallback chain (1 = tried first).
    pub priority: u8,
}

impl ModelSpec {
    pub fn new(name: &str, cost_per_million: f64, priority: u8) -> Self {
        Self {
            name: name.to_string(),
            cost_per_million,
            priority,
        }
    }

    /// Cost of a call that consumed `tokens` tokens.
    pub fn cost_for(&self, tokens: u64) -> f64 {
        (tokens as f64 / 1_000_000.0) * self.cost_per_million
    }
}

/// Escalator configuration.
#[derive(Debug, Clone)]
pub struct EscalatorConfig {
    /// Pass 1 fallback chain, in priority order.
    pub pass1_models: Vec<ModelSpec>,
    /// Pass 2 fallback chain, in priority order.
    pub pass2_models: Vec<ModelSpec>,
    /// Per-call timeout for Pass 1.
    pub pass1_timeout: Duration,
    /// Per-call timeout for Pass 2.
    pub pass2_timeout: Duration,
    /// Completion budget for Pass 1 (the response is a small JSON object).
    pub pass1_max_tokens: u32,
    /// Completion budget for Pass 2.
    pub pass2_max_tokens: u32,
    /// Sampling temperature; 0 for reproducible verdicts.
    pub temperature: f64,
    /// Pass 1 high-risk verdicts at or above this confidence are terminal.
    pub high_risk_threshold: f64,
    /// Pass 1 non-high verdicts at or above this confidence are terminal.
    pub low_risk_threshold: f64,
    /// Multiplier applied to Pass 1 confidence when Pass 2 fails; must be
    /// below 1.0 so the fallback is provably less confident than Pass 1.
    pub degradation_factor: f64,
}

impl Default for EscalatorConfig {
    fn default() -> Self {
        Self {
            pass1_models: vec![
                ModelSpec::new("google/gemini-2.0-flash-exp:free", 0.0, 1),
                ModelSpec::new("meta-llama/llama-3.1-8b-instruct", 0.02, 2),
            ],
            pass2_models: vec![
                ModelSpec::new("google/gemini-2.5-flash-preview-09-2025", 0.30, 1),
                ModelSpec::new("meta-llama/llama-3.1-70b-instruct", 0.05, 2),
            ],
            pass1_timeout: Duration::from_secs(3),
            pass2_timeout: Duration::from_secs(5),
            pass1_max_tokens: 150,
            pass2_max_tokens: 200,
            temperature: 0.0,
            high_risk_threshold: 0.9,
            low_risk_threshold: 0.7,
            degradation_factor: 0.6,
        }
    }
}

impl EscalatorConfig {
    /// Low-latency profile: tighter timeouts, same chains and thresholds.
    pub fn fast() -> Self {
        Self {
            pass1_timeout: Duration::from_secs(2),
            pass2_timeout: Duration::from_secs(3),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_chains_ordered_by_priority() {
        let config = EscalatorConfig::default();
        for chain in [&config.pass1_models, &config.pass2_models] {
            let priorities: Vec<u8> = chain.iter().map(|m| m.priority).collect();
            let mut sorted = priorities.clone();
            sorted.sort_unstable();
            assert_eq!(priorities, sorted);
        }
    }

    #[test]
    fn test_free_tier_model_costs_nothing() {
        let config = EscalatorConfig::default();
        assert_eq!(config.pass1_models[0].cost_for(500_000), 0.0);
    }

    #[test]
    fn test_paid_model_cost() {
        let model = ModelSpec::new("x", 0.30, 1);
        let cost = model.cost_for(1_000_000);
        assert!((cost - 0.30).abs() < 1e-9);
    }

    #[test]
    fn test_fast_profile_tightens_timeouts() {
        let fast = EscalatorConfig::fast();
        assert!(fast.pass1_timeout < EscalatorConfig::default().pass1_timeout);
        assert!(fast.pass2_timeout < EscalatorConfig::default().pass2_timeout);
    }
}
