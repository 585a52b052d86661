//! Error types for the domain store.

use thiserror::Error;

/// Errors emitted by store implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No event matches the supplied name.
    #[error("Event not found")]
    EventNotFound {
        /// Name that failed to resolve.
        name: String,
    },
    /// An event with the same name (ignoring case) already exists.
    #[error("event `{name}` already exists")]
    DuplicateEvent {
        /// Conflicting name.
        name: String,
    },
    /// A record failed primitive validation.
    #[error("invalid record: {source}")]
    InvalidRecord {
        /// Source validation error.
        #[from]
        source: agent_primitives::Error,
    },
    /// Storage backend reported a failure.
    #[error("store backend error: {reason}")]
    Backend {
        /// Human-readable reason describing the failure.
        reason: String,
    },
}

impl StoreError {
    /// Helper to construct backend errors from string-like values.
    #[must_use]
    pub fn backend(reason: impl Into<String>) -> Self {
        Self::Backend {
            reason: reason.into(),
        }
    }

    /// Returns `true` for the unknown-event case, which callers recover from.
    #[must_use]
    pub const fn is_event_not_found(&self) -> bool {
        matches!(self, Self::EventNotFound { .. })
    }
}

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
