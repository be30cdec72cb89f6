//! # Pattern Engine
//!
//! Zero-cost deterministic stage of the validation pipeline. Runs fixed
//! regex/keyword classifiers for each threat family, a business/educational
//! context classifier, and folds in external-reference findings to produce
//! one of three outcomes per prompt:
//!
//! - **terminal unsafe** — an attack pattern matched with no mitigating
//!   context (instant block, no AI spend)
//! - **terminal safe** — nothing matched (or only a bare reference with no
//!   action verb)
//! - **suspicious** — an attack pattern matched *together with* business or
//!   educational context; the verdict is provisional and flagged
//!   `requires_ai` for arbitration
//!
//! Family checks run in a fixed priority order and only the first matching
//! family is reported, even when several match. This is documented contract,
//! not an accident of iteration order.
//!
//! Confidences here are on the attack-evidence scale: 0.0 means no evidence,
//! 1.0 means certain attack. The reference detector's safety-scale numbers
//! are converted at the single boundary inside the engine.

mod context;
mod engine;
mod families;
mod verdict;

pub use context::{ContextClassifier, ContextSignal, ContextType, BUSINESS_KEYWORD_THRESHOLD};
pub use engine::PatternEngine;
pub use families::ThreatFamily;
pub use verdict::{PatternMetadata, PatternVerdict, ThreatLabel};
