//! Pipeline error type.

use std::fmt;

use agent_prompts::{SchemaError, TemplateError};
use agent_store::StoreError;
use thiserror::Error;

use crate::lifecycle::LifecycleError;

/// Stage of the pipeline an error or event refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageKind {
    /// Domain relevance check.
    Validation,
    /// Category and confidence classification.
    Categorization,
    /// Registration field extraction.
    RegistrationExtraction,
    /// Info-request intent extraction.
    InfoExtraction,
    /// Category dispatch, including store operations and queries.
    Routing,
    /// Final natural-language rendering.
    Composition,
}

impl StageKind {
    /// Returns the snake-case label used in logs.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Categorization => "categorization",
            Self::RegistrationExtraction => "registration_extraction",
            Self::InfoExtraction => "info_extraction",
            Self::Routing => "routing",
            Self::Composition => "composition",
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Faults that end a pipeline run.
///
/// Rejected input and low-confidence classification are not errors; they are
/// reported as [`PipelineOutcome`](crate::PipelineOutcome) variants.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The completion service failed, timed out, or returned a payload that
    /// does not match the requested shape.
    #[error("{stage} stage failed: {reason}")]
    Service {
        /// Stage whose call failed.
        stage: StageKind,
        /// Human-readable failure description.
        reason: String,
    },

    /// A stage prompt could not be rendered.
    #[error("prompt rendering failed: {source}")]
    Prompt {
        /// Template failure.
        #[from]
        source: TemplateError,
    },

    /// A stage output schema could not be built.
    #[error("output schema invalid: {source}")]
    Schema {
        /// Schema failure.
        #[from]
        source: SchemaError,
    },

    /// The domain store failed.
    #[error("store failure: {source}")]
    Store {
        /// Store failure.
        #[from]
        source: StoreError,
    },

    /// A routing result could not be serialised for composition.
    #[error("failed to encode stage payload: {source}")]
    Encode {
        /// Serialisation failure.
        #[from]
        source: serde_json::Error,
    },

    /// The run attempted a transition its state machine forbids.
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    /// Pipeline settings were rejected.
    #[error("invalid pipeline configuration: {reason}")]
    Configuration {
        /// Why the configuration was rejected.
        reason: String,
    },

    /// The run was dropped before it started.
    #[error("pipeline run cancelled: {reason}")]
    Cancelled {
        /// Why the run was cancelled.
        reason: String,
    },
}

impl PipelineError {
    /// Convenience constructor for service failures.
    #[must_use]
    pub fn service(stage: StageKind, reason: impl Into<String>) -> Self {
        Self::Service {
            stage,
            reason: reason.into(),
        }
    }

    /// Convenience constructor for configuration failures.
    #[must_use]
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }

    /// Returns the stage for service failures.
    #[must_use]
    pub const fn stage(&self) -> Option<StageKind> {
        match self {
            Self::Service { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

/// Result alias for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;
