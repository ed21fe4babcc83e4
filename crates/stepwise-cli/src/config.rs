//! Configuration for CLI commands
//!
//! Files and `STEPWISE_*` variables are handled by `stepwise-config`; flags
//! given on the command line are layered on top here.

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use stepwise_config::{Config, ConfigLoader};

/// Limits that can be set per invocation
#[derive(Args, Debug, Clone, Default)]
pub struct Overrides {
    /// Use this config file instead of searching for stepwise.toml
    #[arg(long = "config", global = true, value_name = "FILE")]
    pub config_file: Option<PathBuf>,

    /// Maximum number of interpreter steps
    #[arg(long, global = true, value_name = "STEPS",
          value_parser = clap::value_parser!(u64).range(1..))]
    pub step_budget: Option<u64>,

    /// Wall-clock budget in milliseconds
    #[arg(long, global = true, value_name = "MS",
          value_parser = clap::value_parser!(u64).range(1..))]
    pub time_budget_ms: Option<u64>,

    /// Maximum call depth
    #[arg(long, global = true, value_name = "DEPTH",
          value_parser = clap::value_parser!(u64).range(1..))]
    pub max_call_depth: Option<u64>,

    /// Maximum number of recorded events
    #[arg(long, global = true, value_name = "COUNT",
          value_parser = clap::value_parser!(u64).range(1..))]
    pub max_events: Option<u64>,

    /// How deep snapshots descend into nested values
    #[arg(long, global = true, value_name = "DEPTH",
          value_parser = clap::value_parser!(u64).range(1..))]
    pub snapshot_depth: Option<u64>,
}

impl Overrides {
    /// Apply the flags that were given; everything else keeps its loaded value
    pub fn apply(&self, mut config: Config) -> Config {
        if let Some(steps) = self.step_budget {
            config.sandbox.step_budget = steps;
        }
        if let Some(ms) = self.time_budget_ms {
            config.sandbox.time_budget_ms = ms;
        }
        if let Some(depth) = self.max_call_depth {
            config.sandbox.max_call_depth = to_usize(depth);
        }
        if let Some(count) = self.max_events {
            config.sandbox.max_events = to_usize(count);
        }
        if let Some(depth) = self.snapshot_depth {
            config.snapshot.max_depth = to_usize(depth);
        }
        config
    }
}

fn to_usize(value: u64) -> usize {
    usize::try_from(value).unwrap_or(usize::MAX)
}

/// Load the effective configuration
///
/// With `--config` the given file is used; otherwise stepwise.toml is searched
/// for from the working directory upwards. A missing project file is fine.
pub fn load(overrides: &Overrides) -> Result<Config> {
    let mut loader = ConfigLoader::new();
    let config = match &overrides.config_file {
        Some(path) => loader
            .load_from_file(path)
            .with_context(|| format!("Failed to load configuration: {}", path.display()))?,
        None => {
            let cwd = std::env::current_dir().context("Failed to read working directory")?;
            loader
                .load_from_directory(&cwd)
                .context("Failed to load configuration")?
        }
    };
    Ok(overrides.apply(config))
}
