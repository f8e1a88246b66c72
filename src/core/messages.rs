//! core::messages
//!
//! Message keys handed to the UI layer.
//!
//! The UI translates [`MessageKey::key`] into localized text. The
//! [`Display`](std::fmt::Display) impl gives the English fallback, which is
//! also what ends up in logs.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Remediation text attached to every lock-contention failure.
pub const LOCK_CONTENTION_REMEDIATION: &str = "Another Git process seems to be running in this \
repository. Wait for it to finish, or if no Git process is running, delete the lock file \
and retry.";

/// A message with a stable translation key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageKey {
    /// The repository is merging or rebasing with unresolved conflicts.
    ResolveConflictsFirst,
    /// An uncommitted local edit collides with an incoming change.
    PullWouldOverwriteUncommittedChanges,
    /// Uncommitted edits on unrelated files block a rebase.
    PullRebaseFailedBecauseUncommitted,
    /// An untracked file collides with a path added upstream.
    PullRebaseFailedBecauseConflictingPaths,
    /// Staged edits on unrelated files would be recorded by a merge commit.
    PullMergeFailedBecauseStagedChanges,
    /// A pull integrated upstream commits and stopped on conflicts.
    PullWithConflicts,
}

impl MessageKey {
    /// The translation key.
    pub fn key(&self) -> &'static str {
        match self {
            MessageKey::ResolveConflictsFirst => "Resolve_conflicts_first",
            MessageKey::PullWouldOverwriteUncommittedChanges => {
                "Pull_would_overwrite_uncommitted_changes"
            }
            MessageKey::PullRebaseFailedBecauseUncommitted => {
                "Pull_rebase_failed_because_uncommitted"
            }
            MessageKey::PullRebaseFailedBecauseConflictingPaths => {
                "Pull_rebase_failed_because_conflicting_paths"
            }
            MessageKey::PullMergeFailedBecauseStagedChanges => {
                "Pull_merge_failed_because_staged_changes"
            }
            MessageKey::PullWithConflicts => "Pull_with_conflicts",
        }
    }

    /// Check if the key describes a refusal issued before the engine was
    /// asked to integrate anything.
    ///
    /// # Example
    ///
    /// ```
    /// use repoflow::core::messages::MessageKey;
    ///
    /// assert!(MessageKey::ResolveConflictsFirst.is_rejection());
    /// assert!(!MessageKey::PullWithConflicts.is_rejection());
    /// ```
    pub fn is_rejection(&self) -> bool {
        !matches!(self, MessageKey::PullWithConflicts)
    }
}

impl fmt::Display for MessageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            MessageKey::ResolveConflictsFirst => "resolve conflicts first",
            MessageKey::PullWouldOverwriteUncommittedChanges => {
                "pull would overwrite uncommitted changes"
            }
            MessageKey::PullRebaseFailedBecauseUncommitted => {
                "cannot rebase: the working copy has uncommitted changes"
            }
            MessageKey::PullRebaseFailedBecauseConflictingPaths => {
                "cannot pull: untracked files would be overwritten"
            }
            MessageKey::PullMergeFailedBecauseStagedChanges => {
                "cannot merge: the index has staged changes"
            }
            MessageKey::PullWithConflicts => "pull stopped on conflicts",
        };
        f.write_str(text)
    }
}
