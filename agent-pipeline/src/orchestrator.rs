//! The request pipeline: validate, categorize, gate, route, compose.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use agent_adapters::traits::ModelAdapter;
use agent_primitives::RunId;
use agent_store::{DomainStore, InMemoryStore};
use serde::Serialize;
use tracing::{Instrument, info, info_span, warn};

use crate::error::{PipelineError, PipelineResult, StageKind};
use crate::gate::ConfidenceGate;
use crate::lifecycle::{RunEvent, RunLifecycle};
use crate::observer::{PipelineEvent, StageObserver, TracingStageObserver};
use crate::routing::{RouteResult, Router};
use crate::stages::categorization::{Category, CategorizationStage};
use crate::stages::compose::ComposeStage;
use crate::stages::info_request::InfoRequestStage;
use crate::stages::registration::RegistrationStage;
use crate::stages::validation::ValidationStage;
use crate::stages::{CompletionCall, DEFAULT_STAGE_TIMEOUT};

/// Shown when validation rejects the input.
pub const REJECTION_MESSAGE: &str = "Sorry, I don't understand that. Please try again.";

/// Shown when categorization confidence does not clear the gate.
pub const CLARIFY_MESSAGE: &str =
    "I'm not quite sure what you're asking. Could you please rephrase your request?";

/// How a run ended, when it did not fail.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PipelineOutcome {
    /// Every stage ran; `message` is the composed reply.
    Completed {
        /// Category the request was routed under.
        category: Category,
        /// What routing produced.
        result: RouteResult,
        /// Composed user-facing message.
        message: String,
    },
    /// Validation judged the input out of domain.
    Rejected {
        /// Validator's explanation.
        reason: String,
    },
    /// Categorization confidence was too low to act on.
    Clarify {
        /// Category the service guessed.
        category: Category,
        /// Reported confidence.
        confidence: f64,
    },
}

impl PipelineOutcome {
    /// Returns the single message to show the user.
    #[must_use]
    pub fn user_message(&self) -> &str {
        match self {
            Self::Completed { message, .. } => message,
            Self::Rejected { .. } => REJECTION_MESSAGE,
            Self::Clarify { .. } => CLARIFY_MESSAGE,
        }
    }

    /// Returns `true` when the run went through composition.
    #[must_use]
    pub const fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}

/// A configured pipeline. Cheap to share behind an [`Arc`]; runs do not
/// share state except through the store.
pub struct Pipeline {
    validation: ValidationStage,
    categorization: CategorizationStage,
    router: Router,
    compose: ComposeStage,
    store: Arc<dyn DomainStore>,
    gate: ConfidenceGate,
    observer: Arc<dyn StageObserver>,
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("validation", &self.validation)
            .field("categorization", &self.categorization)
            .field("router", &self.router)
            .field("compose", &self.compose)
            .field("gate", &self.gate)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Starts a builder whose stages all use `adapter` unless overridden.
    #[must_use]
    pub fn builder(adapter: Arc<dyn ModelAdapter>) -> PipelineBuilder {
        PipelineBuilder::new(adapter)
    }

    /// Returns the store the pipeline reads and writes.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn DomainStore> {
        &self.store
    }

    /// Returns the confidence gate.
    #[must_use]
    pub const fn gate(&self) -> ConfidenceGate {
        self.gate
    }

    /// Runs one request to completion.
    ///
    /// Stages execute strictly in order, each at most once. Rejection and
    /// low confidence end the run early with an outcome rather than an
    /// error.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Service`] when any completion call fails,
    /// [`PipelineError::Store`] on store failure other than an unknown event
    /// during registration, and [`PipelineError::Lifecycle`] if the run state
    /// machine is violated.
    pub async fn run(&self, input: &str) -> PipelineResult<PipelineOutcome> {
        let run_id = RunId::random();
        let span = info_span!("pipeline_run", %run_id);
        self.execute(run_id, input).instrument(span).await
    }

    async fn execute(&self, run_id: RunId, input: &str) -> PipelineResult<PipelineOutcome> {
        let mut lifecycle = RunLifecycle::new(run_id);
        self.observer.on_event(&PipelineEvent::RunStarted { run_id });

        let verdict = self
            .timed(run_id, StageKind::Validation, self.validation.validate(input))
            .await?;
        lifecycle.transition(RunEvent::Validate)?;
        if !verdict.valid {
            info!(reason = %verdict.reason, "input rejected");
            lifecycle.transition(RunEvent::Reject)?;
            return self.finish(&mut lifecycle, PipelineOutcome::Rejected {
                reason: verdict.reason,
            });
        }

        let (catalog, categorization) = self
            .timed(run_id, StageKind::Categorization, async {
                let catalog = self.store.catalog_context().await?;
                let categorization = self.categorization.categorize(input, &catalog).await?;
                Ok((catalog, categorization))
            })
            .await?;
        lifecycle.transition(RunEvent::Categorize)?;
        info!(
            category = %categorization.category,
            confidence = categorization.confidence,
            "request categorized"
        );

        if !self.gate.evaluate(categorization.confidence).proceeds() {
            warn!(
                category = %categorization.category,
                confidence = categorization.confidence,
                threshold = self.gate.threshold(),
                "confidence too low, asking for clarification"
            );
            lifecycle.transition(RunEvent::LowConfidence)?;
            return self.finish(&mut lifecycle, PipelineOutcome::Clarify {
                category: categorization.category,
                confidence: categorization.confidence,
            });
        }

        let result = self
            .timed(
                run_id,
                StageKind::Routing,
                self.router.route(&categorization, input, &catalog),
            )
            .await?;
        lifecycle.transition(RunEvent::Route)?;

        let message = self
            .timed(
                run_id,
                StageKind::Composition,
                self.compose.compose(&result, &categorization.category),
            )
            .await?;
        lifecycle.transition(RunEvent::Compose)?;

        self.finish(&mut lifecycle, PipelineOutcome::Completed {
            category: categorization.category,
            result,
            message,
        })
    }

    async fn timed<T, F>(&self, run_id: RunId, stage: StageKind, work: F) -> PipelineResult<T>
    where
        F: Future<Output = PipelineResult<T>>,
    {
        let started = Instant::now();
        match work.await {
            Ok(value) => {
                self.observer.on_event(&PipelineEvent::StageCompleted {
                    run_id,
                    stage,
                    elapsed: started.elapsed(),
                });
                Ok(value)
            }
            Err(err) => {
                self.observer.on_event(&PipelineEvent::StageFailed {
                    run_id,
                    stage: err.stage().unwrap_or(stage),
                    reason: err.to_string(),
                });
                Err(err)
            }
        }
    }

    fn finish(
        &self,
        lifecycle: &mut RunLifecycle,
        outcome: PipelineOutcome,
    ) -> PipelineResult<PipelineOutcome> {
        let state = lifecycle.state();
        lifecycle.transition(RunEvent::Finish)?;
        self.observer.on_event(&PipelineEvent::RunFinished {
            run_id: lifecycle.run_id(),
            state,
        });
        Ok(outcome)
    }
}

/// Builder for [`Pipeline`].
pub struct PipelineBuilder {
    adapter: Arc<dyn ModelAdapter>,
    overrides: HashMap<StageKind, Arc<dyn ModelAdapter>>,
    store: Option<Arc<dyn DomainStore>>,
    threshold: f64,
    stage_timeout: Duration,
    temperature: Option<f32>,
    observer: Option<Arc<dyn StageObserver>>,
}

impl fmt::Debug for PipelineBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineBuilder")
            .field("adapter", self.adapter.metadata())
            .field("overrides", &self.overrides.keys().collect::<Vec<_>>())
            .field("threshold", &self.threshold)
            .field("stage_timeout", &self.stage_timeout)
            .field("temperature", &self.temperature)
            .finish_non_exhaustive()
    }
}

impl PipelineBuilder {
    /// Creates a builder with default settings.
    #[must_use]
    pub fn new(adapter: Arc<dyn ModelAdapter>) -> Self {
        Self {
            adapter,
            overrides: HashMap::new(),
            store: None,
            threshold: ConfidenceGate::DEFAULT_THRESHOLD,
            stage_timeout: DEFAULT_STAGE_TIMEOUT,
            temperature: None,
            observer: None,
        }
    }

    /// Uses `adapter` for one stage instead of the default.
    #[must_use]
    pub fn with_stage_adapter(mut self, stage: StageKind, adapter: Arc<dyn ModelAdapter>) -> Self {
        self.overrides.insert(stage, adapter);
        self
    }

    /// Sets the store. Defaults to a freshly seeded [`InMemoryStore`].
    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn DomainStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Sets the confidence threshold; validated on [`build`](Self::build).
    #[must_use]
    pub fn with_confidence_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Sets the timeout applied to each completion call.
    #[must_use]
    pub fn with_stage_timeout(mut self, timeout: Duration) -> Self {
        self.stage_timeout = timeout;
        self
    }

    /// Sets the sampling temperature for every stage.
    #[must_use]
    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    /// Replaces the default [`TracingStageObserver`].
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn StageObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    fn call(&self, stage: StageKind) -> CompletionCall {
        let adapter = self
            .overrides
            .get(&stage)
            .map_or_else(|| Arc::clone(&self.adapter), Arc::clone);
        CompletionCall::new(stage, adapter)
            .with_timeout(self.stage_timeout)
            .with_temperature(self.temperature)
    }

    /// Builds the pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Configuration`] for an out-of-range threshold
    /// or a zero timeout, and [`PipelineError::Store`] if the default store
    /// cannot be seeded.
    pub fn build(self) -> PipelineResult<Pipeline> {
        let gate = ConfidenceGate::new(self.threshold)?;
        if self.stage_timeout.is_zero() {
            return Err(PipelineError::configuration(
                "stage timeout must be greater than zero",
            ));
        }

        let store: Arc<dyn DomainStore> = match &self.store {
            Some(store) => Arc::clone(store),
            None => Arc::new(InMemoryStore::seeded()?),
        };

        let router = Router::new(
            RegistrationStage::new(self.call(StageKind::RegistrationExtraction)),
            InfoRequestStage::new(self.call(StageKind::InfoExtraction), Arc::clone(&store)),
            Arc::clone(&store),
        );

        Ok(Pipeline {
            validation: ValidationStage::new(self.call(StageKind::Validation)),
            categorization: CategorizationStage::new(self.call(StageKind::Categorization)),
            router,
            compose: ComposeStage::new(self.call(StageKind::Composition)),
            store,
            gate,
            observer: self
                .observer
                .unwrap_or_else(|| Arc::new(TracingStageObserver)),
        })
    }
}
