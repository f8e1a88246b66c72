//! git::error
//!
//! The failure vocabulary of the git layer. libgit2 reports an error code
//! plus a class; [`GitError::from_git2`] folds the pair into the handful of
//! cases callers branch on (lock held, conflict, transport, cancelled) and
//! keeps everything else as [`GitError::Internal`] text.

use std::path::PathBuf;

use git2::{ErrorClass, ErrorCode};
use thiserror::Error;

use crate::core::types::TypeError;

/// Errors from the git layer.
#[derive(Debug, Error)]
pub enum GitError {
    #[error("no git working tree at {path}")]
    NotAWorkTree { path: PathBuf },

    #[error("ref not found: {refname}")]
    RefNotFound { refname: String },

    #[error("remote not found: {name}")]
    RemoteNotFound { name: String },

    /// An object, path or other non-ref lookup came back empty.
    #[error("not found: {what}")]
    Missing { what: String },

    /// A name or id was rejected before it reached the engine.
    #[error("invalid {what}")]
    Invalid { what: String },

    /// An index or ref lock file is held, usually by another git process.
    #[error("repository is locked: {message}")]
    Locked {
        path: Option<PathBuf>,
        message: String,
    },

    /// Local edits or index entries stand in the way; `paths` may be empty.
    #[error("conflict: {message}")]
    Conflict { message: String, paths: Vec<String> },

    #[error("unresolved conflicts in {}", paths.join(", "))]
    UnresolvedConflicts { paths: Vec<String> },

    #[error("path is not in conflict: {path}")]
    NotConflicted { path: String },

    #[error("non-fast-forward: {message}")]
    NotFastForward { message: String },

    #[error("transport error: {message}")]
    Transport { message: String },

    /// A progress callback returned false.
    #[error("operation cancelled")]
    Cancelled,

    #[error("working tree i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("git error: {message}")]
    Internal { message: String },
}

impl GitError {
    /// Translate a libgit2 failure; `context` names what was being touched
    /// (a ref, a path, an operation) and prefixes the message.
    pub(crate) fn from_git2(err: git2::Error, context: &str) -> Self {
        let message = format!("{}: {}", context, err.message());
        match err.code() {
            ErrorCode::User => Self::Cancelled,
            ErrorCode::Locked => Self::Locked {
                path: None,
                message,
            },
            ErrorCode::Unmerged => Self::UnresolvedConflicts { paths: Vec::new() },
            ErrorCode::Conflict | ErrorCode::MergeConflict => Self::Conflict {
                message,
                paths: Vec::new(),
            },
            ErrorCode::NotFastForward => Self::NotFastForward { message },
            ErrorCode::NotFound | ErrorCode::UnbornBranch
                if err.class() == ErrorClass::Reference || names_ref(context) =>
            {
                Self::RefNotFound {
                    refname: context.to_string(),
                }
            }
            ErrorCode::NotFound => Self::Missing {
                what: context.to_string(),
            },
            ErrorCode::InvalidSpec => Self::Invalid {
                what: format!("spec {}", context),
            },
            ErrorCode::Auth | ErrorCode::Certificate => Self::Transport { message },
            _ if is_transport_class(err.class()) => Self::Transport { message },
            _ => Self::Internal { message },
        }
    }
}

fn names_ref(context: &str) -> bool {
    context == "HEAD" || context.starts_with("refs/") || context.contains("ref")
}

fn is_transport_class(class: ErrorClass) -> bool {
    matches!(
        class,
        ErrorClass::Net
            | ErrorClass::Ssh
            | ErrorClass::Http
            | ErrorClass::Ssl
            | ErrorClass::Callback
    )
}

impl From<git2::Error> for GitError {
    fn from(err: git2::Error) -> Self {
        Self::from_git2(err, "git")
    }
}

impl From<TypeError> for GitError {
    fn from(err: TypeError) -> Self {
        let what = match err {
            TypeError::InvalidOid(msg) => format!("object id: {}", msg),
            TypeError::InvalidBranchName(msg) => format!("ref name: {}", msg),
        };
        Self::Invalid { what }
    }
}
