//! core::config
//!
//! Configuration schema and loading.
//!
//! # Overview
//!
//! Two configuration scopes:
//! - **Global**: User-level settings
//! - **Repo**: Repository-level overrides
//!
//! # Precedence
//!
//! Later overrides earlier:
//! 1. Default values
//! 2. Global config file
//! 3. Repo config file
//! 4. CLI flags (not handled here)
//!
//! # Global Config Locations
//!
//! Searched in order:
//! 1. `$REPOFLOW_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/repoflow/config.toml`
//! 3. `repoflow/config.toml` under the platform config directory
//!
//! # Repo Config Location
//!
//! `repoflow/config.toml` inside the repository's common git directory,
//! so linked worktrees share the main checkout's file.
//!
//! # Example
//!
//! ```no_run
//! use repoflow::core::config::Config;
//! use std::path::Path;
//!
//! let config = Config::load(Some(Path::new("/path/to/repo/.git"))).unwrap();
//! println!("Remote: {}", config.remote());
//! println!("Pull type: {:?}", config.pull_type());
//! ```

pub mod schema;

pub use schema::{GlobalConfig, RepoConfig, SchedulerConfig};

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::core::types::PullType;

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

/// Merged configuration from all sources.
///
/// Accessors apply precedence rules; repo config overrides global config.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Global configuration
    pub global: GlobalConfig,
    /// Repository configuration (if in a repo)
    pub repo: Option<RepoConfig>,
}

impl Config {
    /// Load configuration from default locations.
    ///
    /// If `git_dir` is provided, also loads repo-specific config.
    ///
    /// # Errors
    ///
    /// Returns an error if config files exist but cannot be parsed.
    /// Missing config files are not an error (defaults are used).
    pub fn load(git_dir: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_from(Self::find_global().as_deref(), git_dir)
    }

    /// Load configuration from an explicit global file and git directory.
    pub fn load_from(global: Option<&Path>, git_dir: Option<&Path>) -> Result<Self, ConfigError> {
        let (global, global_path) = match global.filter(|p| p.exists()) {
            Some(path) => (read_toml::<GlobalConfig>(path)?, Some(path.to_path_buf())),
            None => (GlobalConfig::default(), None),
        };

        let (repo, repo_path) = match git_dir.map(Self::repo_config_path) {
            Some(path) if path.exists() => (Some(read_toml::<RepoConfig>(&path)?), Some(path)),
            _ => (None, None),
        };

        global.validate()?;
        if let Some(ref r) = repo {
            r.validate()?;
        }

        log::debug!(
            "config loaded (global: {:?}, repo: {:?})",
            global_path,
            repo_path
        );

        Ok(Config { global, repo })
    }

    /// Locate the global config file, if any.
    fn find_global() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("REPOFLOW_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        if let Ok(xdg_home) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_home).join("repoflow/config.toml");
            if path.exists() {
                return Some(path);
            }
        }

        dirs::config_dir()
            .map(|dir| dir.join("repoflow/config.toml"))
            .filter(|p| p.exists())
    }

    /// Canonical repo config path for a git directory.
    pub fn repo_config_path(git_dir: &Path) -> PathBuf {
        git_dir.join("repoflow/config.toml")
    }

    // =========================================================================
    // Accessor methods with precedence
    // =========================================================================

    /// Remote used when the current branch has no tracking configuration.
    ///
    /// Defaults to "origin".
    pub fn remote(&self) -> &str {
        self.repo
            .as_ref()
            .and_then(|r| r.remote.as_deref())
            .or(self.global.remote.as_deref())
            .unwrap_or("origin")
    }

    /// Pull strategy. Defaults to [`PullType::MergeFf`].
    pub fn pull_type(&self) -> PullType {
        self.repo
            .as_ref()
            .and_then(|r| r.pull_type)
            .or(self.global.pull_type)
            .unwrap_or_default()
    }

    /// Whether submodules are updated after a successful pull.
    ///
    /// Defaults to `false`.
    pub fn update_submodules_on_pull(&self) -> bool {
        self.repo
            .as_ref()
            .and_then(|r| r.update_submodules_on_pull)
            .or(self.global.update_submodules_on_pull)
            .unwrap_or(false)
    }

    /// Whether the status view lists untracked files. Defaults to `true`.
    pub fn include_untracked(&self) -> bool {
        self.global.include_untracked.unwrap_or(true)
    }

    /// Delay applied to scheduled operations that do not set one.
    pub fn default_delay(&self) -> Option<Duration> {
        self.global
            .scheduler
            .as_ref()
            .and_then(|s| s.delay_ms)
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
    }
}

fn read_toml<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;

    toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_repo_config(git_dir: &Path, contents: &str) {
        let path = Config::repo_config_path(git_dir);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn defaults_without_files() {
        let config = Config::load_from(None, None).unwrap();

        assert_eq!(config.remote(), "origin");
        assert_eq!(config.pull_type(), PullType::MergeFf);
        assert!(!config.update_submodules_on_pull());
        assert!(config.include_untracked());
        assert!(config.default_delay().is_none());
    }

    #[test]
    fn load_global_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(
            &path,
            r#"
            pull_type = "rebase"
            include_untracked = false

            [scheduler]
            delay_ms = 20
            "#,
        )
        .unwrap();

        let config = Config::load_from(Some(&path), None).unwrap();

        assert_eq!(config.pull_type(), PullType::Rebase);
        assert!(!config.include_untracked());
        assert_eq!(config.default_delay(), Some(Duration::from_millis(20)));
    }

    #[test]
    fn missing_global_file_uses_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("absent.toml");

        let config = Config::load_from(Some(&path), None).unwrap();
        assert_eq!(config.pull_type(), PullType::MergeFf);
        assert!(config.include_untracked());
    }

    #[test]
    fn global_remote_is_the_fallback() {
        let temp = TempDir::new().unwrap();
        let global = temp.path().join("global.toml");
        fs::write(&global, "remote = \"mirror\"").unwrap();

        let config = Config::load_from(Some(&global), None).unwrap();
        assert_eq!(config.remote(), "mirror");

        write_repo_config(temp.path(), "remote = \"upstream\"");
        let config = Config::load_from(Some(&global), Some(temp.path())).unwrap();
        assert_eq!(config.remote(), "upstream");
    }

    #[test]
    fn repo_overrides_global() {
        let temp = TempDir::new().unwrap();
        let global = temp.path().join("global.toml");
        fs::write(&global, "pull_type = \"rebase\"\nupdate_submodules_on_pull = true").unwrap();
        write_repo_config(
            temp.path(),
            "remote = \"upstream\"\npull_type = \"merge-ff\"",
        );

        let config = Config::load_from(Some(&global), Some(temp.path())).unwrap();

        assert_eq!(config.remote(), "upstream");
        assert_eq!(config.pull_type(), PullType::MergeFf);
        assert!(config.update_submodules_on_pull());
    }

    #[test]
    fn unknown_fields_rejected() {
        let temp = TempDir::new().unwrap();
        write_repo_config(temp.path(), "remote = \"origin\"\nbogus = 1");

        let result = Config::load_from(None, Some(temp.path()));
        assert!(matches!(result, Err(ConfigError::ParseError { .. })));
    }

    #[test]
    fn invalid_value_rejected() {
        let temp = TempDir::new().unwrap();
        write_repo_config(temp.path(), "remote = \"\"");

        let result = Config::load_from(None, Some(temp.path()));
        assert!(matches!(result, Err(ConfigError::InvalidValue(_))));
    }

    #[test]
    fn zero_delay_means_none() {
        let config = Config {
            global: GlobalConfig {
                scheduler: Some(SchedulerConfig { delay_ms: Some(0) }),
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(config.default_delay().is_none());
    }
}
