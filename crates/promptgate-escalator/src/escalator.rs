//! The two-pass escalation state machine.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::client::{ChatMessage, ChatRequest, Completion, CompletionClient};
use crate::models::{EscalatorConfig, ModelSpec};
use crate::prompts::{pass1_system_prompt, pass2_system_prompt, user_envelope};
use crate::protocol::{parse_pass1, parse_pass2, RiskLevel};
use promptgate_patterns::ContextSignal;

/// Which escalation state produced the terminal outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationStage {
    /// Pass 1 was confident enough to decide alone.
    Pass1,
    /// Pass 2 decided.
    Pass2,
    /// Pass 2 failed; Pass 1's verdict reused with degraded confidence.
    Pass1Fallback,
    /// Pass 1 failed; fail-closed verdict.
    Pass1Error,
}

impl EscalationStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            EscalationStage::Pass1 => "pass1",
            EscalationStage::Pass2 => "pass2",
            EscalationStage::Pass1Fallback => "pass1_fallback",
            EscalationStage::Pass1Error => "pass1_error",
        }
    }
}

/// Terminal result of an escalation. Always well-formed: every failure path
/// inside the escalator maps to an outcome, never an error the caller has
/// to special-case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscalationOutcome {
    pub safe: bool,
    /// Clamped to [0.01, 0.99] — the AI stages never claim certainty.
    pub confidence: f64,
    pub threats: Vec<String>,
    pub reasoning: String,
    pub stage: EscalationStage,
    /// Accumulated token cost across all models actually invoked.
    pub cost: f64,
    /// True when the verdict was produced by a degraded or failed path.
    pub needs_review: bool,
    /// Model that produced the terminal verdict, when one did.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// Two-pass AI escalator.
///
/// Holds only immutable configuration and a shared client handle; each
/// `escalate` call is self-contained, so concurrent requests need no
/// coordination.
pub struct AiEscalator {
    config: EscalatorConfig,
    client: Arc<dyn CompletionClient>,
}

impl AiEscalator {
    pub fn new(config: EscalatorConfig, client: Arc<dyn CompletionClient>) -> Self {
        Self { config, client }
    }

    pub fn config(&self) -> &EscalatorConfig {
        &self.config
    }

    /// Run the escalation state machine over one prompt.
    pub async fn escalate(
        &self,
        prompt: &str,
        context: Option<&ContextSignal>,
    ) -> EscalationOutcome {
        let mut cost = 0.0;
        let envelope = user_envelope(prompt);

        // ---- Pass 1 ----
        let pass1_token = validation_token();
        let pass1_system = pass1_system_prompt(pass1_token, context);

        let (completion, model) = match self
            .call_with_fallback(
                &self.config.pass1_models,
                &pass1_system,
                &envelope,
                self.config.pass1_timeout,
                self.config.pass1_max_tokens,
                &mut cost,
            )
            .await
        {
            Ok(ok) => ok,
            Err(last_error) => {
                warn!(%last_error, "pass 1 transport failure, failing closed");
                return fail_closed(
                    "pass1_error",
                    format!("Pass 1 error ({last_error}), failing closed for security"),
                    cost,
                );
            }
        };

        let pass1 = match parse_pass1(&completion.content, pass1_token) {
            Ok(assessment) => assessment,
            Err(violation) => {
                warn!(%violation, "pass 1 protocol check failed, failing closed");
                return fail_closed(
                    "protocol_integrity_violation",
                    format!("Pass 1 protocol check failed ({violation}) - failing closed"),
                    cost,
                );
            }
        };

        debug!(risk = ?pass1.risk, confidence = pass1.confidence, "pass 1 verdict");

        if pass1.risk == RiskLevel::High && pass1.confidence >= self.config.high_risk_threshold {
            return EscalationOutcome {
                safe: false,
                confidence: clamp_confidence(pass1.confidence),
                threats: vec!["ai_pass1_reject".to_string()],
                reasoning: format!("Pass 1: {}", pass1.context),
                stage: EscalationStage::Pass1,
                cost,
                needs_review: false,
                model: Some(model.clone()),
            };
        }

        if pass1.risk != RiskLevel::High && pass1.confidence >= self.config.low_risk_threshold {
            return EscalationOutcome {
                safe: true,
                confidence: clamp_confidence(pass1.confidence),
                threats: Vec::new(),
                reasoning: format!("Pass 1: {}", pass1.context),
                stage: EscalationStage::Pass1,
                cost,
                needs_review: false,
                model: Some(model),
            };
        }

        // ---- Pass 2 (Pass 1 uncertain) ----
        let pass2_token = validation_token();
        let pass2_system = pass2_system_prompt(pass2_token, &pass1);

        let pass2_result = self
            .call_with_fallback(
                &self.config.pass2_models,
                &pass2_system,
                &envelope,
                self.config.pass2_timeout,
                self.config.pass2_max_tokens,
                &mut cost,
            )
            .await;

        match pass2_result {
            Ok((completion, model)) => match parse_pass2(&completion.content, pass2_token) {
                Ok(pass2) => EscalationOutcome {
                    safe: pass2.safe,
                    confidence: clamp_confidence(pass2.confidence),
                    threats: pass2.threats,
                    reasoning: pass2.reasoning,
                    stage: EscalationStage::Pass2,
                    cost,
                    needs_review: false,
                    model: Some(model),
                },
                Err(violation) => {
                    warn!(%violation, "pass 2 protocol check failed, degrading to pass 1");
                    self.degrade_to_pass1(&pass1, &violation.to_string(), cost)
                }
            },
            Err(last_error) => {
                warn!(%last_error, "pass 2 transport failure, degrading to pass 1");
                self.degrade_to_pass1(&pass1, &last_error, cost)
            }
        }
    }

    /// Fail-degraded path: reuse the Pass 1 verdict with strictly reduced
    /// confidence.
    fn degrade_to_pass1(
        &self,
        pass1: &crate::protocol::Pass1Assessment,
        error: &str,
        cost: f64,
    ) -> EscalationOutcome {
        EscalationOutcome {
            safe: pass1.risk != RiskLevel::High,
            confidence: clamp_confidence(pass1.confidence * self.config.degradation_factor),
            threats: vec!["pass2_error".to_string()],
            reasoning: format!(
                "Pass 2 error ({error}), using Pass 1 result with reduced confidence. Pass 1: {}",
                pass1.context
            ),
            stage: EscalationStage::Pass1Fallback,
            cost,
            needs_review: true,
            model: None,
        }
    }

    /// Walk a fallback chain: each model is attempted once, in priority
    /// order; the first success wins. Timeouts are transport failures.
    async fn call_with_fallback(
        &self,
        models: &[ModelSpec],
        system_prompt: &str,
        user_content: &str,
        timeout: Duration,
        max_tokens: u32,
        cost: &mut f64,
    ) -> Result<(Completion, String), String> {
        let mut last_error = "no models configured".to_string();

        for model in models {
            let request = ChatRequest {
                model: model.name.clone(),
                messages: vec![
                    ChatMessage::system(system_prompt),
                    ChatMessage::user(user_content),
                ],
                temperature: self.config.temperature,
                max_tokens,
                top_p: 1.0,
            };

            match self.client.complete(request, timeout).await {
                Ok(completion) => {
                    *cost += model.cost_for(completion.tokens_used);
                    return Ok((completion, model.name.clone()));
                }
                Err(error) => {
                    debug!(model = %model.name, %error, "model attempt failed, trying next");
                    last_error = format!("{}: {}", model.name, error);
                }
            }
        }

        Err(last_error)
    }
}

/// Per-call validation token: millisecond timestamp, unguessable by the
/// analyzed text (which never sees it).
fn validation_token() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// The AI stages never emit absolute certainty in either direction.
fn clamp_confidence(value: f64) -> f64 {
    value.clamp(0.01, 0.99)
}

fn fail_closed(threat: &str, reasoning: String, cost: f64) -> EscalationOutcome {
    EscalationOutcome {
        safe: false,
        confidence: 0.01,
        threats: vec![threat.to_string()],
        reasoning,
        stage: EscalationStage::Pass1Error,
        cost,
        needs_review: true,
        model: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ClientError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Scripted client: pops one canned step per call. `__TOKEN__` in a
    /// response body is replaced with the validation token extracted from
    /// the system prompt, since tokens are generated per call.
    struct ScriptedClient {
        steps: Mutex<Vec<Result<(String, u64), ClientError>>>,
    }

    impl ScriptedClient {
        fn new(steps: Vec<Result<(String, u64), ClientError>>) -> Self {
            Self {
                steps: Mutex::new(steps),
            }
        }
    }

    #[async_trait]
    impl CompletionClient for ScriptedClient {
        async fn complete(
            &self,
            request: ChatRequest,
            _timeout: Duration,
        ) -> Result<Completion, ClientError> {
            let step = self.steps.lock().unwrap().remove(0);
            step.map(|(body, tokens_used)| {
                let token = regex::Regex::new(r"validation_token: (\d+)")
                    .unwrap()
                    .captures(&request.messages[0].content)
                    .and_then(|c| c.get(1))
                    .map(|m| m.as_str().to_string())
                    .unwrap_or_default();
                Completion {
                    content: body.replace("__TOKEN__", &token),
                    tokens_used,
                }
            })
        }
    }

    fn escalator(steps: Vec<Result<(String, u64), ClientError>>) -> AiEscalator {
        AiEscalator::new(
            EscalatorConfig::default(),
            Arc::new(ScriptedClient::new(steps)),
        )
    }

    fn pass1_body(risk: &str, confidence: f64) -> String {
        format!(
            r#"{{"risk":"{risk}","confidence":{confidence},"context":"test context","legitimate_signals":[],"validation_token":__TOKEN__}}"#
        )
    }

    fn pass2_body(safe: bool, confidence: f64) -> String {
        format!(
            r#"{{"safe":{safe},"confidence":{confidence},"threats":[],"reasoning":"final","validation_token":__TOKEN__}}"#
        )
    }

    #[tokio::test]
    async fn test_confident_low_risk_terminates_at_pass1() {
        let e = escalator(vec![Ok((pass1_body("low", 0.95), 100))]);
        let outcome = e.escalate("prompt", None).await;
        assert!(outcome.safe);
        assert_eq!(outcome.stage, EscalationStage::Pass1);
        assert!(!outcome.needs_review);
        assert_eq!(outcome.cost, 0.0); // free-tier pass 1 model
    }

    #[tokio::test]
    async fn test_confident_high_risk_blocks_at_pass1() {
        let e = escalator(vec![Ok((pass1_body("high", 0.95), 100))]);
        let outcome = e.escalate("prompt", None).await;
        assert!(!outcome.safe);
        assert_eq!(outcome.stage, EscalationStage::Pass1);
        assert_eq!(outcome.threats, vec!["ai_pass1_reject"]);
    }

    #[tokio::test]
    async fn test_medium_risk_below_threshold_goes_to_pass2() {
        let e = escalator(vec![
            Ok((pass1_body("medium", 0.6), 100)),
            Ok((pass2_body(true, 0.9), 200)),
        ]);
        let outcome = e.escalate("prompt", None).await;
        assert!(outcome.safe);
        assert_eq!(outcome.stage, EscalationStage::Pass2);
        assert!((outcome.confidence - 0.9).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_high_risk_low_confidence_goes_to_pass2() {
        let e = escalator(vec![
            Ok((pass1_body("high", 0.5), 100)),
            Ok((pass2_body(false, 0.8), 200)),
        ]);
        let outcome = e.escalate("prompt", None).await;
        assert!(!outcome.safe);
        assert_eq!(outcome.stage, EscalationStage::Pass2);
    }

    #[tokio::test]
    async fn test_pass2_transport_failure_degrades_to_pass1() {
        let e = escalator(vec![
            Ok((pass1_body("medium", 0.6), 100)),
            Err(ClientError::Timeout(Duration::from_secs(5))),
            Err(ClientError::Status(502)),
        ]);
        let outcome = e.escalate("prompt", None).await;
        // medium != high, so the degraded verdict is safe
        assert!(outcome.safe);
        assert_eq!(outcome.stage, EscalationStage::Pass1Fallback);
        assert!(outcome.confidence < 0.6);
        assert!(outcome.threats.contains(&"pass2_error".to_string()));
        assert!(outcome.needs_review);
    }

    #[tokio::test]
    async fn test_pass2_failure_after_high_pass1_stays_unsafe() {
        let e = escalator(vec![
            Ok((pass1_body("high", 0.6), 100)),
            Err(ClientError::Status(500)),
            Err(ClientError::Status(500)),
        ]);
        let outcome = e.escalate("prompt", None).await;
        assert!(!outcome.safe);
        assert_eq!(outcome.stage, EscalationStage::Pass1Fallback);
    }

    #[tokio::test]
    async fn test_pass1_transport_failure_fails_closed() {
        let e = escalator(vec![
            Err(ClientError::Timeout(Duration::from_secs(3))),
            Err(ClientError::Status(503)),
        ]);
        let outcome = e.escalate("prompt", None).await;
        assert!(!outcome.safe);
        assert_eq!(outcome.stage, EscalationStage::Pass1Error);
        assert_eq!(outcome.threats, vec!["pass1_error"]);
        assert!(outcome.needs_review);
        assert!(outcome.confidence <= 0.01);
    }

    #[tokio::test]
    async fn test_pass1_protocol_violation_fails_closed() {
        let e = escalator(vec![Ok((
            r#"{"risk":"low","confidence":0.9}"#.to_string(),
            100,
        ))]);
        let outcome = e.escalate("prompt", None).await;
        assert!(!outcome.safe);
        assert_eq!(outcome.stage, EscalationStage::Pass1Error);
        assert_eq!(outcome.threats, vec!["protocol_integrity_violation"]);
    }

    #[tokio::test]
    async fn test_pass1_fallback_model_used_after_first_fails() {
        let e = escalator(vec![
            Err(ClientError::Status(429)),
            Ok((pass1_body("low", 0.95), 100_000)),
        ]);
        let outcome = e.escalate("prompt", None).await;
        assert!(outcome.safe);
        assert_eq!(outcome.stage, EscalationStage::Pass1);
        // Second pass-1 model is paid: 100k tokens at $0.02/M
        assert!(outcome.cost > 0.0);
        assert_eq!(outcome.model.as_deref(), Some("meta-llama/llama-3.1-8b-instruct"));
    }

    #[tokio::test]
    async fn test_json_repair_handles_prose_wrapped_response() {
        let body = format!("Here is my analysis:\n{}\nDone.", pass1_body("low", 0.95));
        let e = escalator(vec![Ok((body, 100))]);
        let outcome = e.escalate("prompt", None).await;
        assert!(outcome.safe);
        assert_eq!(outcome.stage, EscalationStage::Pass1);
    }

    #[tokio::test]
    async fn test_cost_accumulates_across_passes() {
        let e = escalator(vec![
            Ok((pass1_body("medium", 0.6), 1_000_000)), // free model, $0
            Ok((pass2_body(true, 0.9), 1_000_000)),     // $0.30/M
        ]);
        let outcome = e.escalate("prompt", None).await;
        assert!((outcome.cost - 0.30).abs() < 1e-9);
    }

    #[test]
    fn test_clamp_confidence_bounds() {
        assert_eq!(clamp_confidence(1.5), 0.99);
        assert_eq!(clamp_confidence(0.0), 0.01);
        assert_eq!(clamp_confidence(0.5), 0.5);
    }
}
