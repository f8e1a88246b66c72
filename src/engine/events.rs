//! engine::events
//!
//! Operation lifecycle events.
//!
//! # Architecture
//!
//! Every scheduled operation produces exactly one `about_to_start` followed
//! by exactly one of `succeeded` or `failed`, delivered on the worker
//! thread to every registered [`GitEventListener`]. The bus knows nothing
//! about the UI; the status cache is just another listener.
//!
//! Whether a finished operation counts as a success is decided by its
//! [`OperationOutcome`]: a typed response can carry a refusal (a rejected
//! push, a pre-flight pull rejection) and is then reported as `failed`,
//! while engine-reported conflicts are still successes because the tree
//! changed.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use repoflow::engine::events::{EventBus, GitEventListener, OperationInfo, OperationKind};
//!
//! struct Printer;
//! impl GitEventListener for Printer {
//!     fn succeeded(&self, info: &OperationInfo) {
//!         println!("{} done", info.kind);
//!     }
//! }
//!
//! let bus = EventBus::new();
//! bus.add_listener(Arc::new(Printer));
//! bus.succeeded(&OperationInfo::new(OperationKind::Commit, "commit"));
//! ```

use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};

use serde::Serialize;
use uuid::Uuid;

use super::error::OrchestratorError;
use crate::core::types::{Oid, OperationResponse, PullResponse, PushResponse};
use crate::git::RepoInfo;

/// The closed set of operation kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum OperationKind {
    OpenWorkingCopy,
    SwitchWorkingCopy,
    CloseWorkingCopy,
    Commit,
    Stage,
    Unstage,
    Checkout,
    RestorePaths,
    CreateBranch,
    DeleteBranch,
    Merge,
    ContinueRebase,
    AbortRebase,
    AbortMerge,
    RestartMerge,
    ResolveConflicts,
    StashSave,
    StashApply,
    StashPop,
    StashDrop,
    Reset,
    Revert,
    CreateTag,
    DeleteTag,
    PushTag,
    Fetch,
    Pull,
    Push,
    SubmoduleUpdate,
}

impl OperationKind {
    /// Check if a successful run of this kind can change the status view.
    ///
    /// Only pushing and deleting a branch leave tracked files and the
    /// index alone.
    pub fn invalidates_status(&self) -> bool {
        !matches!(self, OperationKind::Push | OperationKind::DeleteBranch)
    }

    /// Check if this kind writes the index or working tree and therefore
    /// needs the index lock to be free.
    pub fn requires_unlocked_index(&self) -> bool {
        !matches!(
            self,
            OperationKind::Fetch
                | OperationKind::Push
                | OperationKind::PushTag
                | OperationKind::OpenWorkingCopy
                | OperationKind::SwitchWorkingCopy
                | OperationKind::CloseWorkingCopy
        )
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OperationKind::OpenWorkingCopy => "open-working-copy",
            OperationKind::SwitchWorkingCopy => "switch-working-copy",
            OperationKind::CloseWorkingCopy => "close-working-copy",
            OperationKind::Commit => "commit",
            OperationKind::Stage => "stage",
            OperationKind::Unstage => "unstage",
            OperationKind::Checkout => "checkout",
            OperationKind::RestorePaths => "restore-paths",
            OperationKind::CreateBranch => "create-branch",
            OperationKind::DeleteBranch => "delete-branch",
            OperationKind::Merge => "merge",
            OperationKind::ContinueRebase => "continue-rebase",
            OperationKind::AbortRebase => "abort-rebase",
            OperationKind::AbortMerge => "abort-merge",
            OperationKind::RestartMerge => "restart-merge",
            OperationKind::ResolveConflicts => "resolve-conflicts",
            OperationKind::StashSave => "stash-save",
            OperationKind::StashApply => "stash-apply",
            OperationKind::StashPop => "stash-pop",
            OperationKind::StashDrop => "stash-drop",
            OperationKind::Reset => "reset",
            OperationKind::Revert => "revert",
            OperationKind::CreateTag => "create-tag",
            OperationKind::DeleteTag => "delete-tag",
            OperationKind::PushTag => "push-tag",
            OperationKind::Fetch => "fetch",
            OperationKind::Pull => "pull",
            OperationKind::Push => "push",
            OperationKind::SubmoduleUpdate => "submodule-update",
        };
        f.write_str(s)
    }
}

/// Unique identifier of one scheduled operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OperationId(Uuid);

impl OperationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for OperationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What an event is about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationInfo {
    pub id: OperationId,
    pub kind: OperationKind,
    /// Human-readable summary, e.g. "pull (rebase)".
    pub description: String,
}

impl OperationInfo {
    pub fn new(kind: OperationKind, description: impl Into<String>) -> Self {
        Self {
            id: OperationId::new(),
            kind,
            description: description.into(),
        }
    }
}

/// Why an operation was reported as failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationFailure {
    /// Cancelled before or while running.
    Cancelled,
    /// Another process holds a lock.
    LockContention {
        path: PathBuf,
        remediation: &'static str,
    },
    /// The operation ran but its response is a refusal.
    Rejected { message: String },
    /// The operation returned an error.
    Error { message: String },
}

impl OperationFailure {
    pub fn from_error(err: &OrchestratorError) -> Self {
        match err {
            OrchestratorError::Cancelled => OperationFailure::Cancelled,
            OrchestratorError::LockContention { path, remediation } => {
                OperationFailure::LockContention {
                    path: path.clone(),
                    remediation: *remediation,
                }
            }
            other => OperationFailure::Error {
                message: other.to_string(),
            },
        }
    }

    /// Text suitable for a notification.
    pub fn message(&self) -> String {
        match self {
            OperationFailure::Cancelled => "operation cancelled".to_string(),
            OperationFailure::LockContention { path, remediation } => {
                format!("{} is locked. {}", path.display(), remediation)
            }
            OperationFailure::Rejected { message } | OperationFailure::Error { message } => {
                message.clone()
            }
        }
    }
}

/// A finished operation's value, as seen by the event bus.
pub trait OperationOutcome {
    /// A refusal carried by the value, if any.
    fn rejection(&self) -> Option<String> {
        None
    }
}

macro_rules! plain_outcome {
    ($($ty:ty),* $(,)?) => {
        $(impl OperationOutcome for $ty {})*
    };
}

plain_outcome!((), bool, usize, Oid, Option<Oid>, RepoInfo, OperationResponse);

impl OperationOutcome for PullResponse {
    fn rejection(&self) -> Option<String> {
        self.message
            .filter(|key| key.is_rejection())
            .map(|key| key.to_string())
    }
}

impl OperationOutcome for PushResponse {
    fn rejection(&self) -> Option<String> {
        if self.is_rejected() {
            Some(
                self.message
                    .clone()
                    .unwrap_or_else(|| "push rejected".to_string()),
            )
        } else {
            None
        }
    }
}

/// Receives operation lifecycle events.
///
/// Callbacks run on the worker thread and should return quickly.
pub trait GitEventListener: Send + Sync {
    fn about_to_start(&self, _info: &OperationInfo) {}

    fn succeeded(&self, _info: &OperationInfo) {}

    fn failed(&self, _info: &OperationInfo, _failure: &OperationFailure) {}
}

/// Fan-out of lifecycle events to registered listeners.
#[derive(Default)]
pub struct EventBus {
    listeners: RwLock<Vec<Arc<dyn GitEventListener>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_listener(&self, listener: Arc<dyn GitEventListener>) {
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(listener);
    }

    /// Remove a listener previously added. Returns false if it was not registered.
    pub fn remove_listener(&self, listener: &Arc<dyn GitEventListener>) -> bool {
        let mut listeners = self
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let before = listeners.len();
        listeners.retain(|l| !Arc::ptr_eq(l, listener));
        listeners.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn about_to_start(&self, info: &OperationInfo) {
        log::debug!("[{}] {} starting", info.id, info.description);
        for listener in self.snapshot() {
            listener.about_to_start(info);
        }
    }

    pub fn succeeded(&self, info: &OperationInfo) {
        log::debug!("[{}] {} succeeded", info.id, info.description);
        for listener in self.snapshot() {
            listener.succeeded(info);
        }
    }

    pub fn failed(&self, info: &OperationInfo, failure: &OperationFailure) {
        log::info!(
            "[{}] {} failed: {}",
            info.id,
            info.description,
            failure.message()
        );
        for listener in self.snapshot() {
            listener.failed(info, failure);
        }
    }

    // Listeners may register others from a callback; don't hold the lock.
    fn snapshot(&self) -> Vec<Arc<dyn GitEventListener>> {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listener_count())
            .finish()
    }
}
