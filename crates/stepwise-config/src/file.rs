//! On-disk configuration format (stepwise.toml / ~/.stepwise/config.toml)
//!
//! Every key is optional so that partial files can be layered on top of each
//! other; [`crate::Config`] fills in the defaults.

use crate::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Parsed configuration file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    /// Sandbox resource limits
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sandbox: Option<SandboxSection>,

    /// Snapshot settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<SnapshotSection>,
}

/// `[sandbox]`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct SandboxSection {
    /// Statements plus loop iterations a program may execute
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step_budget: Option<u64>,

    /// Wall-clock budget in milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_budget_ms: Option<u64>,

    /// Maximum nesting of function calls
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_call_depth: Option<usize>,

    /// Maximum number of probe events a run may record
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_events: Option<usize>,

    /// Native stack of the worker thread, in MiB
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack_size_mb: Option<usize>,
}

/// `[snapshot]`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct SnapshotSection {
    /// Nesting depth after which values are cut
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_depth: Option<usize>,
}

impl ConfigFile {
    /// Load a configuration file
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound(path.to_path_buf())
            } else {
                ConfigError::IoError(e)
            }
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::TomlParseError {
            file: path.to_path_buf(),
            error: e,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Reject zero limits
    pub fn validate(&self) -> ConfigResult<()> {
        if let Some(sandbox) = &self.sandbox {
            check_positive("sandbox.step_budget", sandbox.step_budget.map(|v| v as u128))?;
            check_positive(
                "sandbox.time_budget_ms",
                sandbox.time_budget_ms.map(|v| v as u128),
            )?;
            check_positive(
                "sandbox.max_call_depth",
                sandbox.max_call_depth.map(|v| v as u128),
            )?;
            check_positive("sandbox.max_events", sandbox.max_events.map(|v| v as u128))?;
            check_positive(
                "sandbox.stack_size_mb",
                sandbox.stack_size_mb.map(|v| v as u128),
            )?;
        }
        if let Some(snapshot) = &self.snapshot {
            check_positive("snapshot.max_depth", snapshot.max_depth.map(|v| v as u128))?;
        }
        Ok(())
    }

    /// Layer `other` on top of this config; keys set in `other` win
    pub fn merge(&mut self, other: &ConfigFile) {
        if let Some(theirs) = &other.sandbox {
            let ours = self.sandbox.get_or_insert_with(Default::default);
            ours.step_budget = theirs.step_budget.or(ours.step_budget);
            ours.time_budget_ms = theirs.time_budget_ms.or(ours.time_budget_ms);
            ours.max_call_depth = theirs.max_call_depth.or(ours.max_call_depth);
            ours.max_events = theirs.max_events.or(ours.max_events);
            ours.stack_size_mb = theirs.stack_size_mb.or(ours.stack_size_mb);
        }
        if let Some(theirs) = &other.snapshot {
            let ours = self.snapshot.get_or_insert_with(Default::default);
            ours.max_depth = theirs.max_depth.or(ours.max_depth);
        }
    }

    pub(crate) fn sandbox_mut(&mut self) -> &mut SandboxSection {
        self.sandbox.get_or_insert_with(Default::default)
    }

    pub(crate) fn snapshot_mut(&mut self) -> &mut SnapshotSection {
        self.snapshot.get_or_insert_with(Default::default)
    }
}

fn check_positive(field: &str, value: Option<u128>) -> ConfigResult<()> {
    if value == Some(0) {
        return Err(ConfigError::InvalidValue {
            field: field.to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(())
}
