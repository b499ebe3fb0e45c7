//! Command-line interface of the `trellis` binary

use crate::render;
use crate::scenario::{Replayer, Scenario};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use trellis_core::NetworkConfig;

/// Trellis matching engine tools
#[derive(Debug, Parser)]
#[command(name = "trellis")]
#[command(about = "Replay fact streams through a Trellis RETE network")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Replay a scenario's events and report activations
    Replay {
        /// Scenario file (YAML or JSON)
        #[arg(short, long)]
        scenario: PathBuf,

        /// Network configuration file, replacing the scenario's own
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Show the compiled network of a scenario's rules
    Inspect {
        #[arg(short, long)]
        scenario: PathBuf,

        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

impl Cli {
    /// Run the command and return what should be printed
    pub fn execute(&self) -> Result<String> {
        match &self.command {
            Command::Replay { scenario, config } => self.replay(scenario, config.as_deref()),
            Command::Inspect { scenario, config } => self.inspect(scenario, config.as_deref()),
        }
    }

    fn replay(&self, path: &Path, config: Option<&Path>) -> Result<String> {
        let scenario = Scenario::from_file(path)?;
        let config = resolve_config(&scenario, config)?;
        let network = Arc::new(scenario.build_network(config)?);
        info!(scenario = %path.display(), events = scenario.events.len(), "Replaying scenario");

        let report = Replayer::new(network).replay(&scenario.events)?;
        match self.format {
            OutputFormat::Json => {
                serde_json::to_string_pretty(&report).context("Failed to serialise replay report")
            }
            OutputFormat::Text => Ok(render::replay_text(&report)),
        }
    }

    fn inspect(&self, path: &Path, config: Option<&Path>) -> Result<String> {
        let scenario = Scenario::from_file(path)?;
        let config = resolve_config(&scenario, config)?;
        let network = scenario.build_network(config)?;
        let summaries = network.node_summaries();
        match self.format {
            OutputFormat::Json => {
                serde_json::to_string_pretty(&summaries).context("Failed to serialise network layout")
            }
            OutputFormat::Text => Ok(render::layout_text(&summaries)),
        }
    }
}

/// Configuration file, else the scenario's section, else defaults; then `TRELLIS_*`
/// environment overrides.
pub fn resolve_config(scenario: &Scenario, file: Option<&Path>) -> Result<NetworkConfig> {
    let base = match file {
        Some(path) => NetworkConfig::from_file(path)?,
        None => scenario.config.clone().unwrap_or_default(),
    };
    let config = base.with_env_overrides();
    config.validate()?;
    Ok(config)
}
