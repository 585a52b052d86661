//! Shared error definitions for agent primitives.

use thiserror::Error;
use uuid::Error as UuidError;

/// Result alias used throughout the workspace for primitive types.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while constructing primitive types.
#[derive(Debug, Error)]
pub enum Error {
    /// The provided run identifier could not be parsed.
    #[error("invalid run id: {source}")]
    InvalidRunId {
        /// Source parsing error from the UUID library.
        #[from]
        source: UuidError,
    },

    /// A numeric record identifier could not be parsed.
    #[error("invalid {kind} id `{value}`: {reason}")]
    InvalidRecordId {
        /// Which record family the identifier belongs to.
        kind: &'static str,
        /// The offending input.
        value: String,
        /// Human-readable reason for rejection.
        reason: String,
    },

    /// A domain record failed validation.
    #[error("invalid {kind}: {reason}")]
    InvalidRecord {
        /// Which record family failed validation.
        kind: &'static str,
        /// Human-readable reason for rejection.
        reason: String,
    },
}

impl Error {
    /// Convenience constructor for record validation failures.
    #[must_use]
    pub fn invalid_record(kind: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidRecord {
            kind,
            reason: reason.into(),
        }
    }
}
