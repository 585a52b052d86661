//! The event-request pipeline.
//!
//! A run validates the input, categorizes it, gates on the reported
//! confidence, routes it to registration or an information query, and
//! composes the reply. [`Pipeline`] drives one run; [`PipelineScheduler`]
//! runs many concurrently over a shared store.

#![warn(missing_docs, clippy::pedantic)]

pub mod error;
pub mod gate;
pub mod lifecycle;
pub mod observer;
pub mod orchestrator;
pub mod query;
pub mod routing;
pub mod scheduler;
pub mod stages;

pub use error::{PipelineError, PipelineResult, StageKind};
pub use gate::{ConfidenceGate, GateDecision};
pub use lifecycle::{LifecycleError, LifecycleResult, RunEvent, RunLifecycle, RunState};
pub use observer::{CompositeObserver, PipelineEvent, StageObserver, TracingStageObserver};
pub use orchestrator::{
    CLARIFY_MESSAGE, Pipeline, PipelineBuilder, PipelineOutcome, REJECTION_MESSAGE,
};
pub use query::{InfoQuery, QueryResult, QueryType, execute_query};
pub use routing::{MISSING_ATTENDEE_MESSAGE, NO_ROUTE_MESSAGE, RouteResult, Router};
pub use scheduler::{PipelineScheduler, RunHandle, SchedulerConfig, SchedulerError, SchedulerResult};
pub use stages::categorization::{Categorization, Category};
pub use stages::registration::RegistrationRequest;
pub use stages::validation::ValidationResult;
pub use stages::{CompletionCall, DEFAULT_STAGE_TIMEOUT};
