//! Prompt-chained assistant for event registration and event information.
//!
//! This facade bundles the workspace crates behind feature flags. A typical
//! program loads [`config`] settings, installs [`telemetry`], builds an
//! [`adapters`] client, and hands it to a [`pipeline::Pipeline`] over a
//! [`store`].

#![warn(missing_docs, clippy::pedantic)]

/// Identifiers and domain records.
pub use agent_primitives as primitives;

/// Prompt templates and output schemas (enabled by `prompts` feature).
#[cfg(feature = "prompts")]
pub use agent_prompts as prompts;

/// Completion-service adapters (enabled by `adapters` feature).
#[cfg(feature = "adapters")]
pub use agent_adapters as adapters;

/// Event and attendee storage (enabled by `store` feature).
#[cfg(feature = "store")]
pub use agent_store as store;

/// Stages, routing, and orchestration (enabled by `pipeline` feature).
#[cfg(feature = "pipeline")]
pub use agent_pipeline as pipeline;

/// Layered settings (enabled by `config` feature).
#[cfg(feature = "config")]
pub use agent_config as config;

/// Tracing setup (enabled by `telemetry` feature).
#[cfg(feature = "telemetry")]
pub use agent_telemetry as telemetry;
