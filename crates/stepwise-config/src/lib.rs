//! Stepwise Configuration System
//!
//! Resource limits for the tracing sandbox and snapshot settings, loaded from:
//! - Global user configuration (~/.stepwise/config.toml)
//! - Project configuration (stepwise.toml, found by walking up from a directory)
//!
//! # Configuration Hierarchy
//!
//! Configuration is loaded and merged in the following order (later overrides earlier):
//! 1. Global config (~/.stepwise/config.toml)
//! 2. Project config (./stepwise.toml)
//! 3. Environment variables (STEPWISE_*)
//! 4. CLI flags
//!
//! # Example
//!
//! ```no_run
//! use stepwise_config::ConfigLoader;
//! use std::path::Path;
//!
//! let mut loader = ConfigLoader::new();
//! let config = loader.load_from_directory(Path::new(".")).unwrap();
//! println!("step budget: {}", config.sandbox.step_budget);
//! ```

pub mod file;
pub mod loader;

use std::path::PathBuf;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid TOML syntax in {file}: {error}")]
    TomlParseError {
        file: PathBuf,
        error: toml::de::Error,
    },

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Failed to render configuration: {0}")]
    RenderError(#[from] toml::ser::Error),

    #[error("Home directory not found")]
    HomeNotFound,
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

pub use file::{ConfigFile, SandboxSection, SnapshotSection};
pub use loader::{Config, ConfigLoader, SandboxConfig, SnapshotConfig};

/// Name of the project configuration file
pub const PROJECT_CONFIG_FILE: &str = "stepwise.toml";
