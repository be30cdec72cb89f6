//! # PromptGate Core
//!
//! Real-time validation firewall for text bound for downstream language
//! models: inspects a prompt and returns a safe/unsafe verdict with a
//! confidence score, a threat taxonomy, stage attribution, and cost/latency
//! accounting, so callers can block, flag, or allow content before it
//! reaches an LLM or is logged.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                        PROMPTGATE CORE                         │
//! ├────────────────────────────────────────────────────────────────┤
//! │                                                                │
//! │                     ┌─────────────────┐                        │
//! │                     │   PromptGate    │  ← Unified Facade      │
//! │                     └────────┬────────┘                        │
//! │                              │                                 │
//! │        ┌────────────┬────────┴────────┬────────────┐           │
//! │        ▼            ▼                 ▼            ▼           │
//! │  ┌──────────┐ ┌───────────┐    ┌───────────┐ ┌───────────┐    │
//! │  │  Custom  │ │  Pattern  │    │ Reference │ │    AI     │    │
//! │  │  Lists   │ │  Engine   │───▶│ Detector  │ │ Escalator │    │
//! │  └──────────┘ └───────────┘    └───────────┘ └───────────┘    │
//! │                                                                │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Pipeline
//!
//! 1. **Rejections** — empty/oversized input and tier quota violations are
//!    the only `Err` returns, raised before the pipeline runs
//! 2. **Cache** — LRU+TTL read keyed by (tenant, prompt, mode)
//! 3. **Custom lists** — blacklist match is terminal (`custom_blacklist`);
//!    a whitelist match is recorded but cannot override pattern detection
//! 4. **Pattern engine** — jailbreak/repetition/attack families plus
//!    reference escalation; terminal unless context makes it ambiguous
//! 5. **AI escalation** — two passes, fail-closed then fail-degraded
//!
//! Every internal failure resolves to a well-formed [`ValidationDecision`]
//! with `needs_review` set — callers never special-case pipeline errors.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use promptgate_core::{GateConfig, PromptGate, ValidationOptions};
//!
//! let gate = PromptGate::new(GateConfig::default());
//! let decision = gate.validate("user text", &ValidationOptions::default()).await?;
//! if decision.safe {
//!     // forward to the model
//! }
//! ```

mod cache;
mod config;
mod decision;
mod error;
mod validator;

pub use cache::DecisionCache;
pub use config::{CacheConfig, GateConfig, LimitsConfig, ValidationMode};
pub use decision::{Stage, ValidationDecision, ValidationOptions};
pub use error::ValidateError;
pub use validator::PromptGate;

// Re-export component types for convenience
pub use promptgate_escalator::{
    ChatRequest, ClientError, Completion, CompletionClient, EscalatorConfig,
    HttpCompletionClient, ModelSpec,
};
pub use promptgate_lists::{CustomRules, ListMatch, ListMatchKind, ProfileLists, Tier};
pub use promptgate_patterns::{ContextSignal, ContextType, PatternEngine, ThreatFamily};
pub use promptgate_references::{ReferenceDetector, ReferenceReport};
