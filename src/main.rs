//! RulePilot command line entry point.

use std::io::{self, Read};
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use rule_pilot::models::rule::{Platform, RuleDescription};
use rule_pilot::models::settings::AppConfig;
use rule_pilot::services::{
    IterationLoop, OracleSet, RuleConverter, RuleGenerator, SegmentClassifier,
};
use rule_pilot::storage::config::ConfigService;
use rule_pilot_core::PipelineEvent;
use rule_pilot_llm::CompletionClient;
use rule_pilot_quality_gates::QualityGate;
use tokio::sync::mpsc;

#[derive(Parser)]
#[command(name = "rule-pilot")]
#[command(version)]
#[command(about = "Generate, repair and translate security detection rules")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (defaults to <config dir>/rule-pilot/config.toml)
    #[arg(long, short, global = true, env = "RULE_PILOT_CONFIG")]
    config: Option<PathBuf>,

    /// Completion provider: openai, deepseek or llama
    #[arg(long, short, global = true)]
    provider: Option<String>,
}

#[derive(clap::Args)]
struct DescriptionArgs {
    /// Rule description (reads stdin if not provided)
    description: Option<String>,

    /// Target platform: splunk, sentinel or elastic
    #[arg(long, short = 't', default_value = "splunk")]
    platform: String,

    /// Fields the query must produce
    #[arg(long)]
    required_fields: Option<String>,

    /// Example log line
    #[arg(long)]
    sample_log: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a rule through DSL decomposition
    Generate {
        #[command(flatten)]
        input: DescriptionArgs,

        /// Run the score-and-repair loop instead of streaming
        #[arg(long)]
        agent: bool,

        /// Iteration budget for --agent (defaults to the configured value)
        #[arg(long)]
        max_iterations: Option<u32>,

        /// Polish the rendered query (non-agent mode, no streaming)
        #[arg(long, conflicts_with = "agent")]
        polish: bool,
    },

    /// Generate a rule with a single completion call
    Simple {
        #[command(flatten)]
        input: DescriptionArgs,
    },

    /// Translate a rule to another platform
    Convert {
        /// Source rule (reads stdin if not provided)
        rule: Option<String>,

        /// Source platform
        #[arg(long)]
        from: String,

        /// Target platform
        #[arg(long)]
        to: String,
    },

    /// Check that the completion provider is reachable
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = ConfigService::load(cli.config.as_deref())
        .context("Failed to load configuration")?
        .into_config();
    let client = build_client(&config, cli.provider.as_deref())?;

    match cli.command {
        Commands::Generate {
            input,
            agent,
            max_iterations,
            polish,
        } => {
            let description = input.into_description()?;
            if agent {
                let oracles = OracleSet::for_platform(description.platform, &config)?;
                let gate = QualityGate::new(config.pipeline.score_threshold)?;
                let agent = IterationLoop::new(client, oracles.syntax, oracles.execution, gate);
                let iterations = max_iterations.unwrap_or(config.pipeline.max_iterations);
                let run = agent.run(&description, iterations).await?;
                tracing::info!(outcome = ?run.outcome, rounds = run.rounds.len(), "agent finished");
                println!("{}", run.final_query);
            } else if polish {
                let query = RuleGenerator::new(client).generate(&description).await?;
                println!("{}", query);
            } else {
                stream_generation(client, description).await?;
            }
        }
        Commands::Simple { input } => {
            let description = input.into_description()?;
            let query = RuleGenerator::new(client).generate_simple(&description).await?;
            println!("{}", query);
        }
        Commands::Convert { rule, from, to } => {
            let source = Platform::from_str(&from)?;
            let target = Platform::from_str(&to)?;
            let text = text_or_stdin(rule)?;
            let source_rule = SegmentClassifier::new(client.clone())
                .analyze(source, text.trim_end())
                .await?;
            let converted = RuleConverter::new(client)
                .convert(&source_rule, target)
                .await?;
            println!("{}", converted.text());
        }
        Commands::Check => {
            let provider = client.provider();
            provider
                .health_check()
                .await
                .with_context(|| format!("{} ({}) is not reachable", provider.name(), provider.model()))?;
            println!("{} ({}) is reachable", provider.name(), provider.model());
        }
    }

    Ok(())
}

impl DescriptionArgs {
    fn into_description(self) -> Result<RuleDescription> {
        let platform = Platform::from_str(&self.platform)?;
        let text = text_or_stdin(self.description)?;
        if text.trim().is_empty() {
            bail!("A rule description is required");
        }
        let mut description = RuleDescription::new(text.trim(), platform);
        if let Some(fields) = self.required_fields {
            description = description.with_required_fields(fields);
        }
        if let Some(log) = self.sample_log {
            description = description.with_sample_log(log);
        }
        Ok(description)
    }
}

fn build_client(config: &AppConfig, provider: Option<&str>) -> Result<CompletionClient> {
    let provider_config = match provider {
        Some(name) => config.provider_config(name)?,
        None => config.default_provider_config()?,
    };
    tracing::info!(provider = %provider_config.provider, model = %provider_config.model, "using provider");
    Ok(CompletionClient::with_provider(
        provider_config,
        config.pipeline.retry_policy(),
    )?)
}

fn text_or_stdin(text: Option<String>) -> Result<String> {
    match text {
        Some(text) => Ok(text),
        None => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .context("Failed to read stdin")?;
            Ok(buffer)
        }
    }
}

/// Print decomposition events as they arrive, then the final query.
async fn stream_generation(client: CompletionClient, description: RuleDescription) -> Result<()> {
    let (tx, mut rx) = mpsc::channel::<PipelineEvent>(32);
    let generator = RuleGenerator::new(client);
    let producer = tokio::spawn(async move { generator.generate_streaming(&description, tx).await });

    while let Some(event) = rx.recv().await {
        match &event {
            PipelineEvent::StepReasoning { step, text } => {
                println!("## {}\n{}\n", step, text);
            }
            PipelineEvent::StepStatements { statements, .. } => {
                if !statements.is_empty() {
                    println!("```plaintext\n{}\n```\n", statements.join("\n"));
                }
            }
            PipelineEvent::FinalResult { program } => {
                println!("## {}\n```plaintext\n{}\n```\n", event.stage(), program);
            }
            PipelineEvent::FinalRule { query } => {
                println!("## {}\n{}", event.stage(), query);
            }
        }
    }

    producer.await.context("Generation task panicked")??;
    Ok(())
}
