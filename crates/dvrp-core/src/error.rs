//! Parameter validation errors.
//!
//! Structural model errors (`ModelError`) and decision errors
//! (`DecisionError`) live in the crates that detect them; this crate only
//! owns the value-level checks shared by all of them.

use thiserror::Error;

/// An invalid scalar parameter, caught at construction time.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("non-finite simulation time: {0}")]
    NonFiniteTime(f64),

    #[error("negative duration: {0}")]
    NegativeDuration(f64),

    #[error("resource capacity must be at least 1")]
    ZeroCapacity,

    #[error("quantity must be positive: {0}")]
    NonPositiveQuantity(f64),

    #[error("period must be positive: {0}")]
    NonPositivePeriod(f64),
}
