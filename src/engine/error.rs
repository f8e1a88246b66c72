//! engine::error
//!
//! The orchestrator's error type.
//!
//! Expected outcomes (up to date, conflicts, rejected pushes, pre-flight
//! refusals) are typed responses, not errors. `OrchestratorError` covers the
//! exceptional: lock contention, transport failures, invalid requests and
//! engine faults. Nothing here is retried automatically.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::core::config::ConfigError;
use crate::core::messages::LOCK_CONTENTION_REMEDIATION;
use crate::core::types::RepositoryState;
use crate::git::GitError;

/// Errors from orchestrated operations.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// No working copy is open.
    #[error("no repository is open")]
    NoRepository,

    /// An invariant was violated.
    #[error("internal error: {0}")]
    Internal(String),

    /// Engine failure with no more specific category.
    #[error(transparent)]
    Git(GitError),

    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The operation observed its cancellation token.
    #[error("operation cancelled")]
    Cancelled,

    /// The current branch has no upstream to pull from or push to.
    #[error("the current branch has no upstream branch")]
    NoUpstream,

    /// A path handed to conflict resolution is not conflicted.
    #[error("path is not in conflict: {path}")]
    NotConflicted { path: String },

    /// Conflict resolution was requested outside a merge or rebase.
    #[error("no merge or rebase is in progress")]
    NoConflictInProgress,

    /// The index still has conflicts.
    #[error("unresolved conflicts in {}", paths.join(", "))]
    UnresolvedConflicts { paths: Vec<String> },

    /// The repository state forbids the operation.
    #[error("not allowed while the repository is {state}")]
    BlockingState { state: RepositoryState },

    /// Local edits block a checkout.
    #[error("checkout would overwrite local changes in {}", paths.join(", "))]
    CheckoutConflict { paths: Vec<String> },

    /// An index or ref lock file is held by another process.
    #[error("{} is locked. {remediation}", path.display())]
    LockContention {
        path: PathBuf,
        remediation: &'static str,
    },

    /// Network or remote failure.
    #[error("{operation} failed: {message}")]
    Transport { operation: String, message: String },
}

/// Result alias for orchestrated operations.
pub type Result<T> = std::result::Result<T, OrchestratorError>;

impl OrchestratorError {
    /// Lock contention on `path`, with the standard remediation.
    pub fn lock_contention(path: impl Into<PathBuf>) -> Self {
        OrchestratorError::LockContention {
            path: path.into(),
            remediation: LOCK_CONTENTION_REMEDIATION,
        }
    }

    /// Map an engine error raised by a remote operation.
    pub fn from_remote(operation: &str, err: GitError) -> Self {
        match err {
            GitError::Transport { message } => OrchestratorError::Transport {
                operation: operation.to_string(),
                message,
            },
            other => other.into(),
        }
    }

    /// Check if this is lock contention.
    pub fn is_lock_contention(&self) -> bool {
        matches!(self, OrchestratorError::LockContention { .. })
    }

    /// Fold lock-flavored engine faults into [`OrchestratorError::LockContention`].
    ///
    /// Some libgit2 code paths report a held lock as a generic error whose
    /// message names the lock file.
    pub fn reclassify(self) -> Self {
        match self {
            OrchestratorError::Git(GitError::Internal { message }) if mentions_lock(&message) => {
                OrchestratorError::lock_contention(lock_path_in(&message))
            }
            other => other,
        }
    }

    /// Anchor a relative lock path at the repository's git directory.
    pub fn rooted_at(self, git_dir: &Path) -> Self {
        match self {
            OrchestratorError::LockContention { path, remediation } if path.is_relative() => {
                OrchestratorError::LockContention {
                    path: git_dir.join(path),
                    remediation,
                }
            }
            other => other,
        }
    }
}

impl From<GitError> for OrchestratorError {
    fn from(err: GitError) -> Self {
        match err {
            GitError::Locked { path, .. } => {
                OrchestratorError::lock_contention(path.unwrap_or_else(|| PathBuf::from("index.lock")))
            }
            GitError::Cancelled => OrchestratorError::Cancelled,
            GitError::UnresolvedConflicts { paths } => {
                OrchestratorError::UnresolvedConflicts { paths }
            }
            GitError::NotConflicted { path } => OrchestratorError::NotConflicted { path },
            GitError::Transport { message } => OrchestratorError::Transport {
                operation: "remote".to_string(),
                message,
            },
            other => OrchestratorError::Git(other),
        }
    }
}

fn mentions_lock(message: &str) -> bool {
    let message = message.to_ascii_lowercase();
    message.contains(".lock") || message.contains("locked")
}

/// Pull the quoted `*.lock` path out of an engine message, if present.
fn lock_path_in(message: &str) -> PathBuf {
    message
        .split(['\'', '"'])
        .find(|part| part.ends_with(".lock"))
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("index.lock"))
}
