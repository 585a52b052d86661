//! Tracing setup shared by the binaries.
//!
//! Call [`init_tracing`] once at startup. `RUST_LOG`, when set, wins over the
//! configured default directive.

#![warn(missing_docs, clippy::pedantic)]

use thiserror::Error;
use tracing::Subscriber;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::util::SubscriberInitExt;

/// Errors raised while installing the subscriber.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// A global subscriber is already installed.
    #[error("a global tracing subscriber is already installed")]
    AlreadyInitialised,

    /// The filter directive does not parse.
    #[error("invalid log filter `{directive}`: {reason}")]
    InvalidFilter {
        /// Offending directive.
        directive: String,
        /// Parser message.
        reason: String,
    },
}

/// Result alias for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;

/// Subscriber options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    /// Default filter directive, e.g. `info` or `agent_pipeline=debug`.
    pub filter: String,
    /// Print the event target (module path).
    pub with_target: bool,
    /// Colourise output.
    pub ansi: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_owned(),
            with_target: false,
            ansi: true,
        }
    }
}

impl TelemetryConfig {
    /// Uses `filter` as the default directive.
    #[must_use]
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = filter.into();
        self
    }

    /// Switches to `debug` with targets shown, for stage-by-stage output.
    #[must_use]
    pub fn verbose(mut self) -> Self {
        self.filter = "debug".to_owned();
        self.with_target = true;
        self
    }
}

/// Builds the filter from `RUST_LOG` if present, otherwise from `fallback`.
///
/// # Errors
///
/// Returns [`TelemetryError::InvalidFilter`] if the chosen directive does not
/// parse.
pub fn resolve_filter(rust_log: Option<&str>, fallback: &str) -> TelemetryResult<EnvFilter> {
    let directive = rust_log
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(fallback);
    EnvFilter::try_new(directive).map_err(|err| TelemetryError::InvalidFilter {
        directive: directive.to_owned(),
        reason: err.to_string(),
    })
}

/// Builds the stderr `fmt` subscriber without installing it.
///
/// Useful with [`tracing::subscriber::with_default`] for work that runs
/// before the final filter is known, such as loading settings.
///
/// # Errors
///
/// Returns [`TelemetryError::InvalidFilter`] for a malformed directive.
pub fn build_subscriber(
    config: &TelemetryConfig,
) -> TelemetryResult<impl Subscriber + Send + Sync + 'static> {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = resolve_filter(rust_log.as_deref(), &config.filter)?;

    Ok(tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(config.with_target)
        .with_ansi(config.ansi)
        .with_writer(std::io::stderr)
        .finish())
}

/// Installs a `fmt` subscriber on stderr for the whole process.
///
/// # Errors
///
/// Returns [`TelemetryError::InvalidFilter`] for a malformed directive and
/// [`TelemetryError::AlreadyInitialised`] when called twice.
pub fn init_tracing(config: &TelemetryConfig) -> TelemetryResult<()> {
    build_subscriber(config)?
        .try_init()
        .map_err(|_| TelemetryError::AlreadyInitialised)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rust_log_wins_over_fallback() {
        let filter = resolve_filter(Some("agent_pipeline=trace"), "info").unwrap();
        assert_eq!(filter.to_string(), "agent_pipeline=trace");

        let filter = resolve_filter(Some("  "), "warn").unwrap();
        assert_eq!(filter.to_string(), "warn");
    }

    #[test]
    fn malformed_directive_is_reported() {
        let err = resolve_filter(None, "agent_pipeline=loud").expect_err("bad level");
        assert!(matches!(err, TelemetryError::InvalidFilter { .. }));
    }

    #[test]
    fn verbose_enables_debug_with_targets() {
        let config = TelemetryConfig::default().verbose();
        assert_eq!(config.filter, "debug");
        assert!(config.with_target);
    }

    #[test]
    fn scoped_subscriber_enables_the_configured_level() {
        let subscriber = build_subscriber(&TelemetryConfig::default().verbose()).unwrap();
        tracing::subscriber::with_default(subscriber, || {
            if std::env::var(EnvFilter::DEFAULT_ENV).is_err() {
                assert!(tracing::enabled!(tracing::Level::DEBUG));
                assert!(!tracing::enabled!(tracing::Level::TRACE));
            }
        });
    }

    #[test]
    fn second_initialisation_fails() {
        let config = TelemetryConfig::default().with_filter("off");
        let first = init_tracing(&config);
        let second = init_tracing(&config);
        assert!(first.is_ok() || matches!(first, Err(TelemetryError::AlreadyInitialised)));
        assert!(matches!(second, Err(TelemetryError::AlreadyInitialised)));
    }
}
