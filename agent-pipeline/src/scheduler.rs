//! Bounded concurrent execution of independent pipeline runs.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

use crate::error::{PipelineError, PipelineResult};
use crate::orchestrator::{Pipeline, PipelineOutcome};

const DEFAULT_MAX_CONCURRENCY: NonZeroUsize = match NonZeroUsize::new(16) {
    Some(limit) => limit,
    None => NonZeroUsize::MIN,
};

/// Maximum number of runs allowed in flight at once.
#[derive(Debug, Clone, Copy)]
pub struct SchedulerConfig {
    max_concurrency: NonZeroUsize,
}

impl SchedulerConfig {
    /// Creates a configuration with the supplied concurrency limit.
    #[must_use]
    pub const fn new(max_concurrency: NonZeroUsize) -> Self {
        Self { max_concurrency }
    }

    /// Returns the configured concurrency limit.
    #[must_use]
    pub const fn max_concurrency(self) -> NonZeroUsize {
        self.max_concurrency
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CONCURRENCY)
    }
}

/// Handle to a submitted run.
pub type RunHandle = JoinHandle<PipelineResult<PipelineOutcome>>;

/// Spawns pipeline runs on tokio, at most `max_concurrency` at a time.
///
/// Runs share only the pipeline's store.
#[derive(Debug, Clone)]
pub struct PipelineScheduler {
    pipeline: Arc<Pipeline>,
    semaphore: Arc<Semaphore>,
    closed: Arc<AtomicBool>,
    config: SchedulerConfig,
}

impl PipelineScheduler {
    /// Creates a scheduler over `pipeline`.
    #[must_use]
    pub fn new(pipeline: Arc<Pipeline>, config: SchedulerConfig) -> Self {
        Self {
            pipeline,
            semaphore: Arc::new(Semaphore::new(config.max_concurrency().get())),
            closed: Arc::new(AtomicBool::new(false)),
            config,
        }
    }

    /// Returns the associated configuration.
    #[must_use]
    pub const fn config(&self) -> SchedulerConfig {
        self.config
    }

    /// Returns the shared pipeline.
    #[must_use]
    pub fn pipeline(&self) -> &Arc<Pipeline> {
        &self.pipeline
    }

    /// Returns `true` once [`close`](Self::close) has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Stops accepting runs. Runs still waiting for a slot resolve to
    /// [`PipelineError::Cancelled`]; runs already executing finish.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.semaphore.close();
    }

    /// Submits one request.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Closed`] when the scheduler no longer
    /// accepts runs.
    pub fn submit(&self, input: impl Into<String>) -> SchedulerResult<RunHandle> {
        if self.is_closed() {
            return Err(SchedulerError::Closed);
        }

        let input = input.into();
        let pipeline = Arc::clone(&self.pipeline);
        let semaphore = Arc::clone(&self.semaphore);

        Ok(tokio::spawn(async move {
            let _permit = semaphore
                .acquire_owned()
                .await
                .map_err(|_| PipelineError::Cancelled {
                    reason: "scheduler closed while the run was queued".to_owned(),
                })?;
            pipeline.run(&input).await
        }))
    }
}

/// Errors produced by the scheduler.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchedulerError {
    /// Scheduler is closed and will not accept new runs.
    #[error("scheduler closed")]
    Closed,
}

/// Result alias for scheduler operations.
pub type SchedulerResult<T> = Result<T, SchedulerError>;
