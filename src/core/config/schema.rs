//! core::config::schema
//!
//! Configuration schema types.
//!
//! # Global Config
//!
//! Located at (in order of precedence):
//! 1. `$REPOFLOW_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/repoflow/config.toml`
//! 3. `repoflow/config.toml` under the platform config directory
//!
//! # Repo Config
//!
//! Located at `<common git dir>/repoflow/config.toml`.
//!
//! # Validation
//!
//! Config values are validated after parsing.

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::core::types::PullType;

/// Upper bound for the default scheduling delay (one minute).
pub const MAX_DELAY_MS: u64 = 60_000;

/// Global configuration (user scope).
///
/// # Example
///
/// ```toml
/// remote = "origin"
/// pull_type = "rebase"
/// update_submodules_on_pull = true
/// include_untracked = true
///
/// [scheduler]
/// delay_ms = 0
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct GlobalConfig {
    /// Remote used when neither the branch nor the repository names one
    pub remote: Option<String>,

    /// Default pull strategy
    pub pull_type: Option<PullType>,

    /// Update submodules after a successful pull
    pub update_submodules_on_pull: Option<bool>,

    /// List untracked files in the status view
    pub include_untracked: Option<bool>,

    /// Scheduler defaults
    pub scheduler: Option<SchedulerConfig>,
}

impl GlobalConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(remote) = &self.remote {
            validate_remote(remote)?;
        }
        if let Some(scheduler) = &self.scheduler {
            scheduler.validate()?;
        }
        Ok(())
    }
}

/// Repository configuration.
///
/// # Example
///
/// ```toml
/// remote = "upstream"
/// pull_type = "merge-ff"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RepoConfig {
    /// Remote used when the current branch has no tracking configuration
    pub remote: Option<String>,

    /// Pull strategy for this repository
    pub pull_type: Option<PullType>,

    /// Submodule auto-update override
    pub update_submodules_on_pull: Option<bool>,
}

impl RepoConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(remote) = &self.remote {
            validate_remote(remote)?;
        }
        Ok(())
    }
}

fn validate_remote(remote: &str) -> Result<(), ConfigError> {
    if remote.trim().is_empty() {
        return Err(ConfigError::InvalidValue(
            "remote cannot be empty".to_string(),
        ));
    }
    if remote.contains(char::is_whitespace) {
        return Err(ConfigError::InvalidValue(format!(
            "invalid remote name '{}'",
            remote
        )));
    }
    Ok(())
}

/// Scheduler defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SchedulerConfig {
    /// Delay applied to operations scheduled without an explicit delay
    pub delay_ms: Option<u64>,
}

impl SchedulerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.delay_ms {
            Some(ms) if ms > MAX_DELAY_MS => Err(ConfigError::InvalidValue(format!(
                "scheduler.delay_ms must be at most {}, got {}",
                MAX_DELAY_MS, ms
            ))),
            _ => Ok(()),
        }
    }
}
