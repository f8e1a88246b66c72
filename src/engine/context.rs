//! engine::context
//!
//! The currently open working copy.
//!
//! A [`RepositoryContext`] holds at most one [`RepositoryHandle`]. Opening,
//! switching and closing replace it under the write lock; every operation
//! and query reads it under the read lock, so none ever sees a handle
//! mid-swap. The engine repository itself sits behind the handle's mutex,
//! shared by the worker and read-only queries.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use super::error::{OrchestratorError, Result};
use crate::core::config::Config;
use crate::git::{Git, RepoInfo};

/// Where the global configuration comes from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ConfigSource {
    /// Search the standard locations.
    #[default]
    Discover,
    /// Read this file (missing means defaults).
    File(PathBuf),
    /// Built-in defaults only; the repository file is still read.
    Defaults,
}

impl ConfigSource {
    fn load(&self, git_dir: &Path) -> Result<Config> {
        let config = match self {
            ConfigSource::Discover => Config::load(Some(git_dir))?,
            ConfigSource::File(path) => Config::load_from(Some(path.as_path()), Some(git_dir))?,
            ConfigSource::Defaults => Config::load_from(None, Some(git_dir))?,
        };
        Ok(config)
    }

    /// The global layer alone, before any working copy is open.
    pub(crate) fn load_global(&self) -> Result<Config> {
        let config = match self {
            ConfigSource::Discover => Config::load(None)?,
            ConfigSource::File(path) => Config::load_from(Some(path.as_path()), None)?,
            ConfigSource::Defaults => Config::default(),
        };
        Ok(config)
    }
}

/// One open repository and its configuration.
pub struct RepositoryHandle {
    info: RepoInfo,
    config: Config,
    git: Mutex<Git>,
}

impl RepositoryHandle {
    /// Open the repository containing `path`.
    pub fn open(path: &Path, source: &ConfigSource) -> Result<Self> {
        let git = Git::open(path)?;
        let info = git.info()?;
        let config = source.load(git.common_dir())?;
        log::info!("opened working copy {}", info.work_dir.display());

        Ok(Self {
            info,
            config,
            git: Mutex::new(git),
        })
    }

    pub fn info(&self) -> &RepoInfo {
        &self.info
    }

    pub fn work_dir(&self) -> &Path {
        &self.info.work_dir
    }

    pub fn git_dir(&self) -> &Path {
        &self.info.git_dir
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run `f` with exclusive access to the engine repository.
    ///
    /// A panic inside an earlier holder does not make the repository
    /// unusable; the on-disk state is the source of truth.
    pub fn with_git<R>(&self, f: impl FnOnce(&mut Git) -> Result<R>) -> Result<R> {
        let mut git = self.git.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut git)
    }
}

impl std::fmt::Debug for RepositoryHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepositoryHandle")
            .field("work_dir", &self.info.work_dir)
            .finish()
    }
}

/// Holder of the single active repository handle.
#[derive(Debug, Default)]
pub struct RepositoryContext {
    current: RwLock<Option<Arc<RepositoryHandle>>>,
}

impl RepositoryContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// The active handle.
    ///
    /// # Errors
    ///
    /// - [`OrchestratorError::NoRepository`] if nothing is open
    pub fn current(&self) -> Result<Arc<RepositoryHandle>> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(OrchestratorError::NoRepository)
    }

    pub fn is_open(&self) -> bool {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Swap in a new handle (or none), returning the previous one.
    pub fn replace(&self, handle: Option<Arc<RepositoryHandle>>) -> Option<Arc<RepositoryHandle>> {
        let mut current = self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *current, handle)
    }

    /// Run `f` against the active handle while holding the read lock.
    pub fn read<R>(&self, f: impl FnOnce(&RepositoryHandle) -> Result<R>) -> Result<R> {
        let current = self.current.read().unwrap_or_else(PoisonError::into_inner);
        match current.as_deref() {
            Some(handle) => f(handle),
            None => Err(OrchestratorError::NoRepository),
        }
    }
}
