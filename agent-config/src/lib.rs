//! Pipeline settings.
//!
//! Values are layered: built-in defaults, then an optional JSON file, then
//! `EVENT_AGENT_*` environment variables (a `.env` file in the working
//! directory is honoured). The API key is not part of these settings; the
//! adapter reads it from `OPENAI_API_KEY`.

#![warn(missing_docs, clippy::pedantic)]

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Model used for every stage except validation.
pub const ENV_MODEL: &str = "EVENT_AGENT_MODEL";
/// Model used for validation.
pub const ENV_VALIDATION_MODEL: &str = "EVENT_AGENT_VALIDATION_MODEL";
/// Categorization confidence threshold.
pub const ENV_CONFIDENCE_THRESHOLD: &str = "EVENT_AGENT_CONFIDENCE_THRESHOLD";
/// Per-stage timeout in seconds.
pub const ENV_STAGE_TIMEOUT_SECS: &str = "EVENT_AGENT_STAGE_TIMEOUT_SECS";
/// HTTP request timeout in seconds.
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "EVENT_AGENT_REQUEST_TIMEOUT_SECS";
/// Completion service base URL.
pub const ENV_BASE_URL: &str = "EVENT_AGENT_BASE_URL";
/// Sampling temperature.
pub const ENV_TEMPERATURE: &str = "EVENT_AGENT_TEMPERATURE";
/// Default tracing filter directive.
pub const ENV_LOG: &str = "EVENT_AGENT_LOG";

/// Errors raised while loading or validating settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The settings file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The settings file is not valid JSON for [`PipelineSettings`].
    #[error("failed to parse {path}: {source}")]
    Parse {
        /// File that failed.
        path: PathBuf,
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },

    /// An environment variable holds a value of the wrong type.
    #[error("{key}={value:?} is not a valid {expected}")]
    InvalidValue {
        /// Variable name.
        key: &'static str,
        /// Raw value.
        value: String,
        /// Expected type.
        expected: &'static str,
    },

    /// The assembled settings are inconsistent.
    #[error("invalid settings: {reason}")]
    Invalid {
        /// What is wrong.
        reason: String,
    },
}

impl ConfigError {
    /// Convenience constructor for validation failures.
    #[must_use]
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::Invalid {
            reason: reason.into(),
        }
    }
}

/// Result alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Everything needed to assemble a pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineSettings {
    /// Model for categorization, extraction, and composition.
    pub model: String,
    /// Model for validation.
    pub validation_model: String,
    /// Confidence a categorization must exceed to be routed.
    pub confidence_threshold: f64,
    /// Upper bound on each completion call, in seconds.
    pub stage_timeout_secs: u64,
    /// HTTP timeout handed to the adapter, in seconds.
    pub request_timeout_secs: u64,
    /// Alternative completion service endpoint.
    pub base_url: Option<String>,
    /// Sampling temperature; provider default when unset.
    pub temperature: Option<f32>,
    /// Default tracing filter when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_owned(),
            validation_model: "gpt-4o".to_owned(),
            confidence_threshold: 0.8,
            stage_timeout_secs: 60,
            request_timeout_secs: 60,
            base_url: None,
            temperature: None,
            log_filter: "info".to_owned(),
        }
    }
}

impl PipelineSettings {
    /// Reads settings from a JSON file; missing keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] or [`ConfigError::Parse`].
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let settings = serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "settings file loaded");
        Ok(settings)
    }

    /// Defaults overridden by the process environment.
    ///
    /// # Errors
    ///
    /// See [`PipelineSettings::load`].
    pub fn from_env() -> ConfigResult<Self> {
        Self::load(None)
    }

    /// Defaults, then `path` if given, then the process environment, then
    /// validation.
    ///
    /// # Errors
    ///
    /// Returns file errors, [`ConfigError::InvalidValue`] for malformed
    /// variables, and [`ConfigError::Invalid`] if validation fails.
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        if let Ok(dotenv) = dotenvy::dotenv() {
            debug!(path = %dotenv.display(), ".env loaded");
        }
        let base = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        let settings = base.with_overrides(|key| std::env::var(key).ok())?;
        settings.validate()?;
        Ok(settings)
    }

    /// Applies `EVENT_AGENT_*` overrides from `lookup`. Blank values are
    /// ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] when a numeric variable does not
    /// parse.
    pub fn with_overrides<F>(mut self, lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };

        if let Some(model) = get(ENV_MODEL) {
            self.model = model;
        }
        if let Some(model) = get(ENV_VALIDATION_MODEL) {
            self.validation_model = model;
        }
        if let Some(raw) = get(ENV_CONFIDENCE_THRESHOLD) {
            self.confidence_threshold = parse(ENV_CONFIDENCE_THRESHOLD, raw, "number")?;
        }
        if let Some(raw) = get(ENV_STAGE_TIMEOUT_SECS) {
            self.stage_timeout_secs = parse(ENV_STAGE_TIMEOUT_SECS, raw, "whole number of seconds")?;
        }
        if let Some(raw) = get(ENV_REQUEST_TIMEOUT_SECS) {
            self.request_timeout_secs =
                parse(ENV_REQUEST_TIMEOUT_SECS, raw, "whole number of seconds")?;
        }
        if let Some(url) = get(ENV_BASE_URL) {
            self.base_url = Some(url);
        }
        if let Some(raw) = get(ENV_TEMPERATURE) {
            self.temperature = Some(parse(ENV_TEMPERATURE, raw, "number")?);
        }
        if let Some(filter) = get(ENV_LOG) {
            self.log_filter = filter;
        }
        Ok(self)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for a threshold outside `[0, 1]`, a
    /// blank model name, or a zero timeout.
    pub fn validate(&self) -> ConfigResult<()> {
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(ConfigError::invalid(format!(
                "confidence_threshold must be within [0, 1], got {}",
                self.confidence_threshold
            )));
        }
        if self.model.trim().is_empty() || self.validation_model.trim().is_empty() {
            return Err(ConfigError::invalid("model names must not be empty"));
        }
        if self.stage_timeout_secs == 0 || self.request_timeout_secs == 0 {
            return Err(ConfigError::invalid("timeouts must be greater than zero"));
        }
        if let Some(temperature) = self.temperature {
            if !(0.0..=2.0).contains(&temperature) {
                return Err(ConfigError::invalid(format!(
                    "temperature must be within [0, 2], got {temperature}"
                )));
            }
        }
        Ok(())
    }

    /// Per-stage timeout.
    #[must_use]
    pub const fn stage_timeout(&self) -> Duration {
        Duration::from_secs(self.stage_timeout_secs)
    }

    /// HTTP request timeout.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn parse<T: FromStr>(key: &'static str, value: String, expected: &'static str) -> ConfigResult<T> {
    value
        .parse()
        .map_err(|_| ConfigError::InvalidValue {
            key,
            value,
            expected,
        })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect::<HashMap<_, _>>();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_match_documented_values() {
        let settings = PipelineSettings::default();
        assert_eq!(settings.model, "gpt-4o-mini");
        assert_eq!(settings.validation_model, "gpt-4o");
        assert!((settings.confidence_threshold - 0.8).abs() < f64::EPSILON);
        assert_eq!(settings.stage_timeout(), Duration::from_secs(60));
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn environment_overrides_defaults() {
        let settings = PipelineSettings::default()
            .with_overrides(lookup(&[
                (ENV_MODEL, "gpt-4.1-mini"),
                (ENV_CONFIDENCE_THRESHOLD, "0.65"),
                (ENV_STAGE_TIMEOUT_SECS, "15"),
                (ENV_TEMPERATURE, "0.2"),
                (ENV_BASE_URL, "  "),
            ]))
            .unwrap();
        assert_eq!(settings.model, "gpt-4.1-mini");
        assert!((settings.confidence_threshold - 0.65).abs() < f64::EPSILON);
        assert_eq!(settings.stage_timeout_secs, 15);
        assert_eq!(settings.temperature, Some(0.2));
        assert_eq!(settings.base_url, None);
    }

    #[test]
    fn malformed_numbers_are_reported() {
        let err = PipelineSettings::default()
            .with_overrides(lookup(&[(ENV_STAGE_TIMEOUT_SECS, "soon")]))
            .expect_err("not a number");
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                key: ENV_STAGE_TIMEOUT_SECS,
                ..
            }
        ));
    }

    #[test]
    fn validation_rejects_out_of_range_values() {
        let mut settings = PipelineSettings {
            confidence_threshold: 1.5,
            ..PipelineSettings::default()
        };
        assert!(settings.validate().is_err());

        settings.confidence_threshold = f64::NAN;
        assert!(settings.validate().is_err());

        settings.confidence_threshold = 0.8;
        settings.request_timeout_secs = 0;
        assert!(settings.validate().is_err());

        settings.request_timeout_secs = 30;
        settings.model = " ".into();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let path = std::env::temp_dir().join(format!("event-agent-settings-{}.json", std::process::id()));
        fs::write(&path, r#"{"confidence_threshold": 0.9, "log_filter": "debug"}"#).unwrap();
        let settings = PipelineSettings::from_file(&path).unwrap();
        fs::remove_file(&path).unwrap();

        assert!((settings.confidence_threshold - 0.9).abs() < f64::EPSILON);
        assert_eq!(settings.log_filter, "debug");
        assert_eq!(settings.model, "gpt-4o-mini");
    }

    #[test]
    fn unknown_file_keys_are_rejected() {
        let path = std::env::temp_dir().join(format!("event-agent-bad-{}.json", std::process::id()));
        fs::write(&path, r#"{"modle": "typo"}"#).unwrap();
        let err = PipelineSettings::from_file(&path).expect_err("unknown key");
        fs::remove_file(&path).unwrap();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
