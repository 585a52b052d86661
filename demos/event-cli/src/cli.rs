use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use event_agents::adapters::openai::{OpenAiAdapter, OpenAiConfig};
use event_agents::adapters::traits::ModelAdapter;
use event_agents::config::PipelineSettings;
use event_agents::pipeline::{Pipeline, StageKind};
use event_agents::store::InMemoryStore;
use event_agents::telemetry::{TelemetryConfig, build_subscriber, init_tracing};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::debug;

#[derive(Debug, Parser)]
#[command(name = "event-cli", about = "Register for events or ask about them")]
pub struct Cli {
    /// JSON settings file layered under the environment.
    #[arg(long, env = "EVENT_AGENT_CONFIG")]
    config: Option<PathBuf>,
    /// Log every stage at debug level.
    #[arg(long, short)]
    verbose: bool,
    /// Override the categorization confidence threshold.
    #[arg(long, value_name = "X")]
    threshold: Option<f64>,
    /// Request text; prompts on stdin when omitted.
    #[arg(value_name = "REQUEST")]
    request: Vec<String>,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let bootstrap = self.telemetry(TelemetryConfig::default());
        let mut settings = tracing::subscriber::with_default(build_subscriber(&bootstrap)?, || {
            PipelineSettings::load(self.config.as_deref())
        })?;
        if let Some(threshold) = self.threshold {
            settings.confidence_threshold = threshold;
            settings.validate()?;
        }

        init_tracing(&self.telemetry(
            TelemetryConfig::default().with_filter(settings.log_filter.clone()),
        ))?;
        debug!(?settings, "settings resolved");

        let input = if self.request.is_empty() {
            prompt_user().await?
        } else {
            self.request.join(" ")
        };

        let pipeline = build_pipeline(&settings)?;
        let outcome = pipeline.run(&input).await?;
        println!("Assistant: {}", outcome.user_message());
        Ok(())
    }

    fn telemetry(&self, config: TelemetryConfig) -> TelemetryConfig {
        if self.verbose { config.verbose() } else { config }
    }
}

fn adapter(settings: &PipelineSettings, model: &str) -> anyhow::Result<Arc<dyn ModelAdapter>> {
    let mut config = OpenAiConfig::from_env(model).with_timeout(settings.request_timeout());
    if let Some(base_url) = &settings.base_url {
        config = config.with_base_url(base_url)?;
    }
    Ok(Arc::new(OpenAiAdapter::new(config)?))
}

fn build_pipeline(settings: &PipelineSettings) -> anyhow::Result<Pipeline> {
    let store = Arc::new(InMemoryStore::seeded().context("seeding demo catalog")?);
    let pipeline = Pipeline::builder(adapter(settings, &settings.model)?)
        .with_stage_adapter(
            StageKind::Validation,
            adapter(settings, &settings.validation_model)?,
        )
        .with_store(store)
        .with_confidence_threshold(settings.confidence_threshold)
        .with_stage_timeout(settings.stage_timeout())
        .with_temperature(settings.temperature)
        .build()?;
    Ok(pipeline)
}

async fn prompt_user() -> anyhow::Result<String> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(b"User: ").await?;
    stdout.flush().await?;

    let mut line = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await
        .context("reading request from stdin")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_owned())
}

#[cfg(test)]
mod tests {
    use std::ffi::OsStr;

    use clap::CommandFactory;

    use super::*;

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn config_path_can_come_from_the_environment() {
        let command = Cli::command();
        let config = command
            .get_arguments()
            .find(|arg| arg.get_id() == "config")
            .expect("config argument");
        assert_eq!(config.get_env(), Some(OsStr::new("EVENT_AGENT_CONFIG")));
    }

    #[test]
    fn request_words_and_overrides_parse() {
        let cli = Cli::try_parse_from([
            "event-cli",
            "--threshold",
            "0.6",
            "-v",
            "Register",
            "Alice",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.threshold, Some(0.6));
        assert_eq!(cli.request.join(" "), "Register Alice");
    }
}
