//! Caller-facing rejection types.
//!
//! These are the only errors `validate` can return, and both are rejected
//! *before* the pipeline runs. Every failure inside the pipeline produces a
//! well-formed [`crate::ValidationDecision`] instead, so callers never
//! special-case internal errors.

use promptgate_lists::TierViolation;
use thiserror::Error;

/// Pre-pipeline rejections.
#[derive(Debug, Error)]
pub enum ValidateError {
    /// Empty prompt.
    #[error("prompt is empty")]
    EmptyPrompt,

    /// Prompt exceeds the configured maximum length.
    #[error("prompt too large: {size} bytes (max: {max})")]
    PromptTooLarge { size: usize, max: usize },

    /// Custom rules exceed the tier's quota.
    #[error("tier limit violation: {0}")]
    TierLimit(#[from] TierViolation),
}
