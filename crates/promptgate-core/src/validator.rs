//! The decision combiner facade.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::cache::DecisionCache;
use crate::config::GateConfig;
use crate::decision::{Stage, ValidationDecision, ValidationOptions};
use crate::error::ValidateError;

use promptgate_escalator::{
    AiEscalator, CompletionClient, EscalationOutcome, EscalationStage, HttpCompletionClient,
};
use promptgate_lists::{check_lists, effective_lists, ListMatch, ListMatchKind};
use promptgate_patterns::{PatternEngine, PatternVerdict};

/// Unified validation facade.
///
/// Sequences the pipeline per request:
///
/// 1. Input bounds and tier quotas (caller-facing rejections)
/// 2. Result cache read
/// 3. Custom lists — a blacklist match is terminal; a whitelist match is
///    recorded but never overrides later pattern detection
/// 4. Pattern engine — terminal unless it flags `requires_ai`
/// 5. AI escalation — always produces a terminal outcome (fail closed at
///    Pass 1, fail degraded at Pass 2)
///
/// Every path below the rejections returns a well-formed decision. The
/// deterministic stages share no mutable state, so one gate instance serves
/// concurrent callers; only the escalator suspends.
pub struct PromptGate {
    config: GateConfig,
    engine: PatternEngine,
    escalator: AiEscalator,
    cache: Option<DecisionCache>,
}

impl PromptGate {
    /// Build a gate with the reqwest-backed completion client.
    pub fn new(config: GateConfig) -> Self {
        let client: Arc<dyn CompletionClient> =
            Arc::new(HttpCompletionClient::new(config.api_key.clone()));
        Self::with_client(config, client)
    }

    /// Build a gate with a caller-supplied completion client.
    pub fn with_client(config: GateConfig, client: Arc<dyn CompletionClient>) -> Self {
        let escalator = AiEscalator::new(config.mode.escalator_config(), client);
        let cache = config
            .cache
            .enabled
            .then(|| DecisionCache::new(config.cache.max_entries, config.cache.ttl));

        Self {
            config,
            engine: PatternEngine::new(),
            escalator,
            cache,
        }
    }

    /// Validate one prompt.
    ///
    /// # Errors
    ///
    /// Only pre-pipeline rejections: empty/oversized input and tier quota
    /// violations. Everything past those checks resolves to a decision.
    pub async fn validate(
        &self,
        prompt: &str,
        options: &ValidationOptions,
    ) -> Result<ValidationDecision, ValidateError> {
        let started = Instant::now();

        if prompt.is_empty() {
            return Err(ValidateError::EmptyPrompt);
        }
        if prompt.len() > self.config.limits.max_prompt_bytes {
            return Err(ValidateError::PromptTooLarge {
                size: prompt.len(),
                max: self.config.limits.max_prompt_bytes,
            });
        }

        // Tier quotas are enforced before any matching happens.
        if let Some(rules) = &options.custom_rules {
            options.tier.limits().validate(
                options.tier,
                rules.whitelist.len(),
                rules.blacklist.len(),
            )?;
        }

        // Cache read.
        let tenant = options.tenant.as_deref().unwrap_or("anonymous");
        let cache_key =
            DecisionCache::fingerprint(tenant, prompt, self.config.mode.as_str());
        if let Some(cache) = &self.cache {
            if let Some(hit) = cache.get(&cache_key) {
                debug!(tenant, "cache hit");
                return Ok(hit);
            }
        }

        let decision = self.run_pipeline(prompt, options, started).await;

        if let Some(cache) = &self.cache {
            cache.put(cache_key, decision.clone());
        }

        Ok(decision)
    }

    async fn run_pipeline(
        &self,
        prompt: &str,
        options: &ValidationOptions,
        started: Instant,
    ) -> ValidationDecision {
        // Stage 0.5: custom lists. Blacklist terminal, whitelist recorded.
        let custom_rule_matched = self.check_custom_lists(prompt, options);

        let blacklist_hit = custom_rule_matched
            .as_ref()
            .filter(|rule| rule.kind == ListMatchKind::Blacklist)
            .map(|rule| (rule.matched_phrase.clone(), rule.confidence));

        if let Some((phrase, confidence)) = blacklist_hit {
            info!(%phrase, "blocked by custom blacklist");
            return ValidationDecision {
                safe: false,
                confidence,
                threats: vec!["custom_blacklist_match".to_string()],
                stage: Stage::CustomBlacklist,
                reasoning: format!("Matched custom blacklist phrase: \"{phrase}\""),
                cost: 0.0,
                processing_time_ms: elapsed_ms(started),
                needs_review: false,
                custom_rule_matched,
                external_references: None,
                model: None,
                decision_id: decision_id(),
                metadata: serde_json::Value::Null,
            };
        }

        // Stage 1: deterministic pattern analysis.
        let verdict = self.engine.detect(prompt);

        if verdict.is_terminal() {
            return self.from_pattern_verdict(verdict, custom_rule_matched, started);
        }

        // Stage 2: AI escalation. The context payload rides along so the
        // model evaluates with the same evidence the engine saw.
        debug!("pattern stage suspicious, escalating to AI");
        let outcome = self
            .escalator
            .escalate(prompt, verdict.context.as_ref())
            .await;

        self.from_escalation(outcome, custom_rule_matched, &verdict, started)
    }

    fn check_custom_lists(
        &self,
        prompt: &str,
        options: &ValidationOptions,
    ) -> Option<ListMatch> {
        if options.custom_rules.is_none() && options.profile.is_none() {
            return None;
        }
        let lists = effective_lists(options.custom_rules.as_ref(), options.profile.as_ref());
        check_lists(prompt, &lists.whitelist, &lists.blacklist)
    }

    fn from_pattern_verdict(
        &self,
        verdict: PatternVerdict,
        custom_rule_matched: Option<ListMatch>,
        started: Instant,
    ) -> ValidationDecision {
        if !verdict.safe {
            warn!(
                threats = ?verdict.threats,
                confidence = verdict.confidence,
                "blocked by pattern stage"
            );
        }

        let external_references = verdict.metadata.external_references.then_some(true);
        let metadata = serde_json::to_value(&verdict.metadata)
            .unwrap_or(serde_json::Value::Null);

        ValidationDecision {
            safe: verdict.safe,
            confidence: verdict.confidence,
            threats: verdict.threats.iter().map(|t| t.as_str().to_string()).collect(),
            stage: Stage::Pattern,
            reasoning: verdict.reasoning,
            cost: 0.0,
            processing_time_ms: elapsed_ms(started),
            needs_review: false,
            custom_rule_matched,
            external_references,
            model: None,
            decision_id: decision_id(),
            metadata,
        }
    }

    fn from_escalation(
        &self,
        outcome: EscalationOutcome,
        custom_rule_matched: Option<ListMatch>,
        verdict: &PatternVerdict,
        started: Instant,
    ) -> ValidationDecision {
        let stage = match outcome.stage {
            EscalationStage::Pass1 => Stage::Pass1,
            EscalationStage::Pass2 => Stage::Pass2,
            EscalationStage::Pass1Fallback => Stage::Pass1Fallback,
            EscalationStage::Pass1Error => Stage::Pass1Error,
        };

        if outcome.needs_review {
            warn!(stage = %stage, "degraded AI verdict, flagged for review");
        }

        let metadata = serde_json::to_value(&verdict.metadata)
            .unwrap_or(serde_json::Value::Null);

        ValidationDecision {
            safe: outcome.safe,
            confidence: outcome.confidence,
            threats: outcome.threats,
            stage,
            reasoning: outcome.reasoning,
            cost: outcome.cost,
            processing_time_ms: elapsed_ms(started),
            needs_review: outcome.needs_review,
            custom_rule_matched,
            external_references: verdict.metadata.external_references.then_some(true),
            model: outcome.model,
            decision_id: decision_id(),
            metadata,
        }
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

fn decision_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
