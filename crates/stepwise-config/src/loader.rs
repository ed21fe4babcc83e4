//! Configuration Loader
//!
//! Handles loading and merging configuration from multiple sources with proper precedence.

use crate::file::ConfigFile;
use crate::{ConfigError, ConfigResult, PROJECT_CONFIG_FILE};
use serde::Serialize;
use std::env;
use std::path::{Path, PathBuf};

/// Default number of statements plus loop iterations per run
pub const DEFAULT_STEP_BUDGET: u64 = 1_000_000;
/// Default wall-clock budget per run
pub const DEFAULT_TIME_BUDGET_MS: u64 = 5_000;
/// Default maximum call nesting
pub const DEFAULT_MAX_CALL_DEPTH: usize = 1_000;
/// Default maximum number of recorded events
pub const DEFAULT_MAX_EVENTS: usize = 100_000;
/// Default worker thread stack size
pub const DEFAULT_STACK_SIZE_MB: usize = 256;
/// Default snapshot nesting depth
pub const DEFAULT_SNAPSHOT_DEPTH: usize = 16;

/// Configuration loader
///
/// Loads configuration from multiple sources and merges them with proper precedence:
/// 1. Global config (~/.stepwise/config.toml) - lowest priority
/// 2. Project config (./stepwise.toml) - overrides global
/// 3. Environment variables (STEPWISE_*) - overrides project
/// 4. CLI flags - highest priority (handled by caller)
pub struct ConfigLoader {
    /// Cached global config path
    global_config_path: Option<PathBuf>,
}

/// Effective sandbox limits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SandboxConfig {
    pub step_budget: u64,
    pub time_budget_ms: u64,
    pub max_call_depth: usize,
    pub max_events: usize,
    pub stack_size_mb: usize,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            step_budget: DEFAULT_STEP_BUDGET,
            time_budget_ms: DEFAULT_TIME_BUDGET_MS,
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            max_events: DEFAULT_MAX_EVENTS,
            stack_size_mb: DEFAULT_STACK_SIZE_MB,
        }
    }
}

/// Effective snapshot settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SnapshotConfig {
    pub max_depth: usize,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_SNAPSHOT_DEPTH,
        }
    }
}

/// Merged configuration result
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Config {
    pub sandbox: SandboxConfig,
    pub snapshot: SnapshotConfig,

    /// Project root directory (where stepwise.toml was found)
    #[serde(skip)]
    pub project_root: Option<PathBuf>,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        Self {
            global_config_path: None,
        }
    }

    /// Use an explicit global config path instead of ~/.stepwise/config.toml
    pub fn with_global_config_path(path: impl Into<PathBuf>) -> Self {
        Self {
            global_config_path: Some(path.into()),
        }
    }

    /// Load configuration starting from the given directory
    ///
    /// Walks up the directory tree to find stepwise.toml, layers it over the
    /// global config and applies environment overrides.
    pub fn load_from_directory(&mut self, start_dir: &Path) -> ConfigResult<Config> {
        let mut merged = self.load_global_config()?;

        let (project_root, project_config) = self.find_project_config(start_dir)?;
        merged.merge(&project_config);

        let merged = self.apply_env_overrides(merged)?;

        Ok(Config::resolve(&merged, project_root))
    }

    /// Load configuration from a specific project config file
    pub fn load_from_file(&mut self, config_path: &Path) -> ConfigResult<Config> {
        let mut merged = self.load_global_config()?;
        merged.merge(&ConfigFile::load_from_file(config_path)?);
        let merged = self.apply_env_overrides(merged)?;

        let project_root = config_path.parent().map(|p| p.to_path_buf());
        Ok(Config::resolve(&merged, project_root))
    }

    /// Find project configuration by walking up directory tree
    fn find_project_config(
        &self,
        start_dir: &Path,
    ) -> ConfigResult<(Option<PathBuf>, ConfigFile)> {
        let mut current = start_dir.to_path_buf();

        loop {
            let config_path = current.join(PROJECT_CONFIG_FILE);

            if config_path.exists() {
                let project_config = ConfigFile::load_from_file(&config_path)?;
                return Ok((Some(current), project_config));
            }

            match current.parent() {
                Some(parent) => current = parent.to_path_buf(),
                None => return Ok((None, ConfigFile::default())),
            }
        }
    }

    /// Load global configuration; a missing file or home directory is not an error
    fn load_global_config(&mut self) -> ConfigResult<ConfigFile> {
        if self.global_config_path.is_none() {
            match Self::global_config_dir() {
                Ok(dir) => self.global_config_path = Some(dir.join("config.toml")),
                Err(ConfigError::HomeNotFound) => return Ok(ConfigFile::default()),
                Err(e) => return Err(e),
            }
        }

        match &self.global_config_path {
            Some(path) if path.exists() => ConfigFile::load_from_file(path),
            _ => Ok(ConfigFile::default()),
        }
    }

    /// Apply STEPWISE_* environment variable overrides
    fn apply_env_overrides(&self, mut config: ConfigFile) -> ConfigResult<ConfigFile> {
        if let Some(v) = env_number::<u64>("STEPWISE_STEP_BUDGET")? {
            config.sandbox_mut().step_budget = Some(v);
        }
        if let Some(v) = env_number::<u64>("STEPWISE_TIME_BUDGET_MS")? {
            config.sandbox_mut().time_budget_ms = Some(v);
        }
        if let Some(v) = env_number::<usize>("STEPWISE_MAX_CALL_DEPTH")? {
            config.sandbox_mut().max_call_depth = Some(v);
        }
        if let Some(v) = env_number::<usize>("STEPWISE_MAX_EVENTS")? {
            config.sandbox_mut().max_events = Some(v);
        }
        if let Some(v) = env_number::<usize>("STEPWISE_SNAPSHOT_DEPTH")? {
            config.snapshot_mut().max_depth = Some(v);
        }

        config.validate()?;
        Ok(config)
    }

    /// Get the global configuration directory (~/.stepwise)
    pub fn global_config_dir() -> ConfigResult<PathBuf> {
        let home = dirs::home_dir().ok_or(ConfigError::HomeNotFound)?;
        Ok(home.join(".stepwise"))
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn env_number<T: std::str::FromStr>(name: &str) -> ConfigResult<Option<T>> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                field: name.to_string(),
                reason: format!("expected a non-negative integer, got '{}'", raw),
            }),
        Err(_) => Ok(None),
    }
}

impl Config {
    /// Fill unset keys with defaults
    pub fn resolve(file: &ConfigFile, project_root: Option<PathBuf>) -> Self {
        let defaults = SandboxConfig::default();
        let sandbox = file.sandbox.clone().unwrap_or_default();
        let snapshot = file.snapshot.clone().unwrap_or_default();

        Self {
            sandbox: SandboxConfig {
                step_budget: sandbox.step_budget.unwrap_or(defaults.step_budget),
                time_budget_ms: sandbox.time_budget_ms.unwrap_or(defaults.time_budget_ms),
                max_call_depth: sandbox.max_call_depth.unwrap_or(defaults.max_call_depth),
                max_events: sandbox.max_events.unwrap_or(defaults.max_events),
                stack_size_mb: sandbox.stack_size_mb.unwrap_or(defaults.stack_size_mb),
            },
            snapshot: SnapshotConfig {
                max_depth: snapshot.max_depth.unwrap_or(DEFAULT_SNAPSHOT_DEPTH),
            },
            project_root,
        }
    }

    /// Get the project root directory
    pub fn project_root(&self) -> Option<&Path> {
        self.project_root.as_deref()
    }

    /// Check if a stepwise.toml was found
    pub fn is_project(&self) -> bool {
        self.project_root.is_some()
    }

    /// Render the effective configuration as TOML
    pub fn to_toml(&self) -> ConfigResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}
