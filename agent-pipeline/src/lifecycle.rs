//! State machine tracking one pipeline run.
//!
//! ```text
//! Start -> Validated -> Categorized -> Routed -> Composed -> Done
//!              |             |
//!              v             v
//!          Rejected       Clarify  -> Done
//! ```

use agent_primitives::RunId;
use thiserror::Error;
use tracing::debug;

/// States a run can occupy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Input captured, nothing executed yet.
    Start,
    /// Validation finished.
    Validated,
    /// Validation judged the input out of domain.
    Rejected,
    /// Categorization finished.
    Categorized,
    /// Confidence did not clear the gate.
    Clarify,
    /// Routing produced a result.
    Routed,
    /// Composition produced the final message.
    Composed,
    /// The run is over.
    Done,
}

impl RunState {
    /// Returns `true` once the run has finished.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done)
    }
}

/// Events that move a run forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunEvent {
    /// Validation returned a result.
    Validate,
    /// The validation result was negative.
    Reject,
    /// Categorization returned a result.
    Categorize,
    /// The confidence gate refused to proceed.
    LowConfidence,
    /// Routing returned a result.
    Route,
    /// Composition returned the message.
    Compose,
    /// Close the run from a terminal branch.
    Finish,
}

/// Transition controller for a single run.
#[derive(Debug, Clone, Copy)]
pub struct RunLifecycle {
    run_id: RunId,
    state: RunState,
}

impl RunLifecycle {
    /// Creates a controller in [`RunState::Start`].
    #[must_use]
    pub const fn new(run_id: RunId) -> Self {
        Self {
            run_id,
            state: RunState::Start,
        }
    }

    /// Returns the run identifier.
    #[must_use]
    pub const fn run_id(&self) -> RunId {
        self.run_id
    }

    /// Returns the current state.
    #[must_use]
    pub const fn state(&self) -> RunState {
        self.state
    }

    /// Applies an event, returning the resulting state.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::InvalidTransition`] when the event is not
    /// allowed from the current state. There are no loops: every state is
    /// left at most once.
    pub fn transition(&mut self, event: RunEvent) -> LifecycleResult<RunState> {
        let next = match (self.state, event) {
            (RunState::Start, RunEvent::Validate) => Some(RunState::Validated),
            (RunState::Validated, RunEvent::Reject) => Some(RunState::Rejected),
            (RunState::Validated, RunEvent::Categorize) => Some(RunState::Categorized),
            (RunState::Categorized, RunEvent::LowConfidence) => Some(RunState::Clarify),
            (RunState::Categorized, RunEvent::Route) => Some(RunState::Routed),
            (RunState::Routed, RunEvent::Compose) => Some(RunState::Composed),
            (RunState::Rejected | RunState::Clarify | RunState::Composed, RunEvent::Finish) => {
                Some(RunState::Done)
            }
            _ => None,
        };

        let Some(next_state) = next else {
            return Err(LifecycleError::InvalidTransition {
                run_id: self.run_id,
                from: self.state,
                event,
            });
        };

        debug!(
            run_id = %self.run_id,
            from = ?self.state,
            to = ?next_state,
            ?event,
            "run transition"
        );
        self.state = next_state;
        Ok(next_state)
    }
}

/// Errors emitted by the run lifecycle.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// Transition was not permitted from the current state.
    #[error("invalid run transition from {from:?} via {event:?} for run {run_id}")]
    InvalidTransition {
        /// Run whose transition failed.
        run_id: RunId,
        /// State prior to the attempted transition.
        from: RunState,
        /// Event that triggered the failure.
        event: RunEvent,
    },
}

/// Result alias used for lifecycle operations.
pub type LifecycleResult<T> = Result<T, LifecycleError>;
