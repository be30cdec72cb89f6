//! # AI Escalation
//!
//! Two-pass AI arbitration for prompts the deterministic stages could not
//! settle: an attack-shaped pattern co-occurring with business or
//! educational context.
//!
//! ## State machine
//!
//! ```text
//! INIT → PASS1_PENDING → PASS1_TERMINAL          (confident verdict)
//!                      → PASS1_ERROR             (fail closed)
//!                      → PASS2_PENDING → PASS2_TERMINAL
//!                                      → PASS1_FALLBACK   (fail degraded)
//! ```
//!
//! Pass 1 uses an inexpensive model; Pass 2 a stronger one. Both walk an
//! ordered, immutable fallback list of models: a transport failure or
//! timeout moves to the next model, attempted once — never a retry of the
//! same model. Responses must match their JSON protocol exactly (all fields
//! present, a per-call validation token echoed back); a best-effort repair
//! extracts embedded JSON from prose, but nothing is ever coerced or
//! defaulted.
//!
//! Failure policy is asymmetric by design: a Pass 1 failure is **fail
//! closed** (unsafe, needs review), while a Pass 2 failure is **fail
//! degraded** — the Pass 1 verdict is reused with strictly reduced
//! confidence, so a flaky expensive model degrades accuracy rather than
//! availability.
//!
//! The escalator is the only pipeline stage that suspends. Each call is
//! self-contained; concurrent requests share nothing but the HTTP client.

mod client;
mod escalator;
mod models;
mod prompts;
mod protocol;

pub use client::{
    ChatMessage, ChatRequest, ClientError, Completion, CompletionClient, HttpCompletionClient,
};
pub use escalator::{AiEscalator, EscalationOutcome, EscalationStage};
pub use models::{EscalatorConfig, ModelSpec};
pub use protocol::{Pass1Assessment, Pass2Assessment, ProtocolError, RiskLevel};
