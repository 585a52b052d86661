//! Hooks notified as a run moves through its stages.

use std::sync::Arc;
use std::time::Duration;

use agent_primitives::RunId;
use tracing::{debug, info, warn};

use crate::error::StageKind;
use crate::lifecycle::RunState;

/// Progress report emitted by the orchestrator.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    /// A run accepted its input.
    RunStarted {
        /// Run identifier.
        run_id: RunId,
    },
    /// A stage returned successfully.
    StageCompleted {
        /// Run identifier.
        run_id: RunId,
        /// Stage that finished.
        stage: StageKind,
        /// Wall-clock time spent in the stage.
        elapsed: Duration,
    },
    /// A stage failed and the run is aborting.
    StageFailed {
        /// Run identifier.
        run_id: RunId,
        /// Stage that failed.
        stage: StageKind,
        /// Failure description.
        reason: String,
    },
    /// The run reached its final state.
    RunFinished {
        /// Run identifier.
        run_id: RunId,
        /// State the run ended in before closing, such as `Composed` or
        /// `Rejected`.
        state: RunState,
    },
}

impl PipelineEvent {
    /// Returns the run the event belongs to.
    #[must_use]
    pub const fn run_id(&self) -> RunId {
        match self {
            Self::RunStarted { run_id }
            | Self::StageCompleted { run_id, .. }
            | Self::StageFailed { run_id, .. }
            | Self::RunFinished { run_id, .. } => *run_id,
        }
    }
}

/// Observer invoked for every [`PipelineEvent`].
pub trait StageObserver: Send + Sync {
    /// Records one event.
    fn on_event(&self, event: &PipelineEvent);
}

/// Observer that writes events to the tracing system.
#[derive(Debug, Default)]
pub struct TracingStageObserver;

impl StageObserver for TracingStageObserver {
    fn on_event(&self, event: &PipelineEvent) {
        match event {
            PipelineEvent::RunStarted { run_id } => {
                debug!(%run_id, "run started");
            }
            PipelineEvent::StageCompleted {
                run_id,
                stage,
                elapsed,
            } => {
                debug!(
                    %run_id,
                    %stage,
                    elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
                    "stage completed"
                );
            }
            PipelineEvent::StageFailed {
                run_id,
                stage,
                reason,
            } => {
                warn!(%run_id, %stage, reason = %reason, "stage failed");
            }
            PipelineEvent::RunFinished { run_id, state } => {
                info!(%run_id, ?state, "run finished");
            }
        }
    }
}

/// Forwards events to a list of observers in order.
#[derive(Default)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn StageObserver>>,
}

impl CompositeObserver {
    /// Creates a composite from the supplied observers.
    #[must_use]
    pub fn new<I>(observers: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn StageObserver>>,
    {
        Self {
            observers: observers.into_iter().collect(),
        }
    }

    /// Adds an observer.
    pub fn push(&mut self, observer: Arc<dyn StageObserver>) {
        self.observers.push(observer);
    }

    /// Returns the number of registered observers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.observers.len()
    }

    /// Returns `true` when no observer is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}

impl StageObserver for CompositeObserver {
    fn on_event(&self, event: &PipelineEvent) {
        for observer in &self.observers {
            observer.on_event(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct Recording(Mutex<Vec<PipelineEvent>>);

    impl StageObserver for Recording {
        fn on_event(&self, event: &PipelineEvent) {
            self.0.lock().unwrap().push(event.clone());
        }
    }

    #[test]
    fn composite_forwards_to_every_observer() {
        let first = Arc::new(Recording::default());
        let second = Arc::new(Recording::default());
        let mut composite = CompositeObserver::new([first.clone() as Arc<dyn StageObserver>]);
        composite.push(second.clone());
        composite.push(Arc::new(TracingStageObserver));
        assert_eq!(composite.len(), 3);

        let run_id = RunId::random();
        composite.on_event(&PipelineEvent::RunStarted { run_id });
        composite.on_event(&PipelineEvent::StageFailed {
            run_id,
            stage: StageKind::Validation,
            reason: "boom".into(),
        });

        for recording in [&first, &second] {
            let events = recording.0.lock().unwrap();
            assert_eq!(events.len(), 2);
            assert!(events.iter().all(|event| event.run_id() == run_id));
        }
    }
}
