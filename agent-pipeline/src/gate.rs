//! Confidence gating between categorization and routing.

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, PipelineResult};

/// Outcome of a gate evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateDecision {
    /// Confidence clears the threshold; continue to routing.
    Proceed,
    /// Confidence is at or below the threshold; ask the user to rephrase.
    Clarify,
}

impl GateDecision {
    /// Returns `true` when the run may continue.
    #[must_use]
    pub const fn proceeds(self) -> bool {
        matches!(self, Self::Proceed)
    }
}

/// Threshold gate over self-reported categorization confidence.
///
/// Only confidence strictly greater than the threshold proceeds. A NaN
/// confidence never proceeds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfidenceGate {
    threshold: f64,
}

impl ConfidenceGate {
    /// Threshold used when none is configured.
    pub const DEFAULT_THRESHOLD: f64 = 0.8;

    /// Creates a gate with the supplied threshold.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Configuration`] unless the threshold is a
    /// finite number in `[0, 1]`.
    pub fn new(threshold: f64) -> PipelineResult<Self> {
        if !threshold.is_finite() || !(0.0..=1.0).contains(&threshold) {
            return Err(PipelineError::configuration(format!(
                "confidence threshold must be within [0, 1], got {threshold}"
            )));
        }
        Ok(Self { threshold })
    }

    /// Returns the configured threshold.
    #[must_use]
    pub const fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Evaluates a confidence score.
    #[must_use]
    pub fn evaluate(&self, confidence: f64) -> GateDecision {
        if confidence > self.threshold {
            GateDecision::Proceed
        } else {
            GateDecision::Clarify
        }
    }
}

impl Default for ConfidenceGate {
    fn default() -> Self {
        Self {
            threshold: Self::DEFAULT_THRESHOLD,
        }
    }
}
