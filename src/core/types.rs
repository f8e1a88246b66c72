//! core::types
//!
//! Strong types for the orchestrator's domain.
//!
//! # Types
//!
//! - [`BranchName`] - Validated Git branch name
//! - [`Oid`] - Git object identifier (SHA)
//! - [`FileStatus`] / [`ChangeType`] - One entry of the status view
//! - [`GitStatus`] - Immutable staged/unstaged snapshot
//! - [`RepositoryState`] - In-progress operation state mirrored from the engine
//! - [`PullType`], [`ConflictResolution`], [`ResetMode`] - Requests that change semantics
//! - [`PullResponse`], [`PushResponse`], [`OperationResponse`] - Typed results
//!
//! # Validation
//!
//! `BranchName` and `Oid` enforce validity at construction time. Invalid
//! values cannot be represented.
//!
//! # Examples
//!
//! ```
//! use repoflow::core::types::{BranchName, Oid};
//!
//! let branch = BranchName::new("feature/my-branch").unwrap();
//! let oid = Oid::new("abc123def4567890abc123def4567890abc12345").unwrap();
//! assert_eq!(oid.short(7), "abc123d");
//!
//! assert!(BranchName::new("invalid..name").is_err());
//! assert!(Oid::new("not-a-sha").is_err());
//! # let _ = branch;
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::messages::MessageKey;

/// Errors from type validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid branch name: {0}")]
    InvalidBranchName(String),

    #[error("invalid object id: {0}")]
    InvalidOid(String),
}

/// A validated Git branch name.
///
/// Branch names must conform to Git's refname rules (see `git check-ref-format`):
/// - Cannot be empty or exactly `@`
/// - Cannot start with `.` or `-`
/// - Cannot end with `.lock` or `/`
/// - Cannot contain `..`, `@{`, `//`, or ASCII control characters
/// - Cannot contain spaces, `~`, `^`, `:`, `\`, `?`, `*`, `[`
///
/// # Example
///
/// ```
/// use repoflow::core::types::BranchName;
///
/// let name = BranchName::new("feature/my-branch").unwrap();
/// assert_eq!(name.as_str(), "feature/my-branch");
///
/// assert!(BranchName::new("").is_err());
/// assert!(BranchName::new("branch.lock").is_err());
/// assert!(BranchName::new("has space").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BranchName(String);

impl BranchName {
    /// Create a new validated branch name.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidBranchName` if the name violates Git's refname rules.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        Self::validate(&name)?;
        Ok(Self(name))
    }

    fn validate(name: &str) -> Result<(), TypeError> {
        let reject = |why: &str| Err(TypeError::InvalidBranchName(why.to_string()));

        if name.is_empty() {
            return reject("branch name cannot be empty");
        }
        if name == "@" {
            return reject("branch name cannot be '@' (reserved)");
        }
        if name.starts_with('.') || name.starts_with('-') {
            return reject("branch name cannot start with '.' or '-'");
        }
        if name.ends_with(".lock") || name.ends_with('/') {
            return reject("branch name cannot end with '.lock' or '/'");
        }
        for forbidden in ["..", "@{", "//"] {
            if name.contains(forbidden) {
                return Err(TypeError::InvalidBranchName(format!(
                    "branch name cannot contain '{forbidden}'"
                )));
            }
        }

        const INVALID_CHARS: [char; 8] = [' ', '~', '^', ':', '\\', '?', '*', '['];
        if let Some(c) = name
            .chars()
            .find(|c| INVALID_CHARS.contains(c) || c.is_ascii_control())
        {
            return Err(TypeError::InvalidBranchName(format!(
                "branch name cannot contain {c:?}"
            )));
        }

        for component in name.split('/') {
            if component.starts_with('.') || component.ends_with(".lock") {
                return reject("path component cannot start with '.' or end with '.lock'");
            }
        }

        Ok(())
    }

    /// Get the branch name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Full ref name of the local branch (`refs/heads/<name>`).
    pub fn local_ref(&self) -> String {
        format!("refs/heads/{}", self.0)
    }
}

impl TryFrom<String> for BranchName {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<BranchName> for String {
    fn from(name: BranchName) -> Self {
        name.0
    }
}

impl AsRef<str> for BranchName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BranchName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A Git object identifier (SHA-1 or SHA-256), normalized to lowercase.
///
/// # Example
///
/// ```
/// use repoflow::core::types::Oid;
///
/// let oid = Oid::new("ABC123DEF4567890ABC123DEF4567890ABC12345").unwrap();
/// assert_eq!(oid.as_str(), "abc123def4567890abc123def4567890abc12345");
/// assert_eq!(oid.short(7), "abc123d");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Oid(String);

impl Oid {
    /// Create a new validated object id.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidOid` if the string is not a valid hex OID.
    pub fn new(oid: impl Into<String>) -> Result<Self, TypeError> {
        let oid = oid.into().to_ascii_lowercase();
        if oid.len() != 40 && oid.len() != 64 {
            return Err(TypeError::InvalidOid(format!(
                "expected 40 or 64 hex characters, got {}",
                oid.len()
            )));
        }
        if !oid.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(TypeError::InvalidOid(
                "object id must be hexadecimal".into(),
            ));
        }
        Ok(Self(oid))
    }

    /// Get the OID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First `len` characters of the OID (the full OID if shorter).
    pub fn short(&self, len: usize) -> &str {
        &self.0[..len.min(self.0.len())]
    }
}

impl TryFrom<String> for Oid {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<Oid> for String {
    fn from(oid: Oid) -> Self {
        oid.0
    }
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Status view
// =============================================================================

/// Kind of change recorded for a single path.
///
/// The declaration order is the sort order used in [`GitStatus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeType {
    /// New file in the index.
    Add,
    /// Tracked file modified in the working tree, not staged.
    Modified,
    /// Modification staged in the index.
    Changed,
    /// Deletion staged in the index.
    Removed,
    /// Tracked file deleted from the working tree, not staged.
    Missing,
    /// File unknown to the index.
    Untracked,
    /// Unresolved conflict.
    Conflict,
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ChangeType::Add => "added",
            ChangeType::Modified => "modified",
            ChangeType::Changed => "changed",
            ChangeType::Removed => "removed",
            ChangeType::Missing => "missing",
            ChangeType::Untracked => "untracked",
            ChangeType::Conflict => "conflict",
        };
        f.write_str(s)
    }
}

/// A single status entry: what changed, and where.
///
/// Equality and ordering are by `(change_type, path)`; the field order
/// makes the derived impls do exactly that.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FileStatus {
    /// The kind of change.
    pub change_type: ChangeType,
    /// Path relative to the working tree root, `/`-separated.
    pub path: String,
}

impl FileStatus {
    /// Create a status entry.
    pub fn new(change_type: ChangeType, path: impl Into<String>) -> Self {
        Self {
            change_type,
            path: path.into(),
        }
    }
}

/// Immutable snapshot of the staged and unstaged file lists.
///
/// Both lists are sorted by `(change_type, path)`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitStatus {
    pub staged_files: Vec<FileStatus>,
    pub unstaged_files: Vec<FileStatus>,
}

impl GitStatus {
    /// Build a snapshot, sorting both lists.
    pub fn new(mut staged_files: Vec<FileStatus>, mut unstaged_files: Vec<FileStatus>) -> Self {
        staged_files.sort();
        unstaged_files.sort();
        Self {
            staged_files,
            unstaged_files,
        }
    }

    /// Check if nothing is staged, modified, or untracked.
    pub fn is_clean(&self) -> bool {
        self.staged_files.is_empty() && self.unstaged_files.is_empty()
    }

    /// Paths currently in conflict.
    pub fn conflicting_paths(&self) -> Vec<String> {
        self.unstaged_files
            .iter()
            .filter(|f| f.change_type == ChangeType::Conflict)
            .map(|f| f.path.clone())
            .collect()
    }
}

// =============================================================================
// Repository state
// =============================================================================

/// In-progress operation state, mirrored from the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RepositoryState {
    /// Nothing in progress.
    Safe,
    /// Merge in progress with unresolved conflicts.
    Merging,
    /// Merge in progress, all conflicts resolved, merge commit pending.
    MergingResolved,
    /// Merge-backend rebase in progress.
    RebasingMerge,
    /// Cherry-pick, revert, bisect, apply-mailbox, or apply-backend rebase.
    Other,
}

impl RepositoryState {
    /// Blocking states gate push and new-branch checkout.
    ///
    /// # Example
    ///
    /// ```
    /// use repoflow::core::types::RepositoryState;
    ///
    /// assert!(RepositoryState::Merging.is_blocking());
    /// assert!(RepositoryState::RebasingMerge.is_blocking());
    /// assert!(!RepositoryState::MergingResolved.is_blocking());
    /// assert!(!RepositoryState::Safe.is_blocking());
    /// ```
    pub fn is_blocking(&self) -> bool {
        matches!(self, RepositoryState::Merging | RepositoryState::RebasingMerge)
    }

    /// Check if a merge (resolved or not) is in progress.
    pub fn is_merge(&self) -> bool {
        matches!(self, RepositoryState::Merging | RepositoryState::MergingResolved)
    }
}

impl fmt::Display for RepositoryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RepositoryState::Safe => "safe",
            RepositoryState::Merging => "merging",
            RepositoryState::MergingResolved => "merging (resolved)",
            RepositoryState::RebasingMerge => "rebasing",
            RepositoryState::Other => "other operation in progress",
        };
        f.write_str(s)
    }
}

/// How a pull integrates upstream commits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PullType {
    /// Fast-forward when possible, merge otherwise.
    #[default]
    MergeFf,
    /// Rebase local commits onto the upstream tip.
    Rebase,
}

/// A conflict resolution request.
///
/// Which side of the conflict it selects depends on the repository state;
/// see [`ConflictResolution::side_for`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConflictResolution {
    ResolveUsingMine,
    ResolveUsingTheirs,
}

/// Where the content chosen by a resolution comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConflictSide {
    /// The current branch (merge).
    Local,
    /// The merged-in commit (merge).
    Incoming,
    /// The upstream tip being rebased onto (rebase).
    Upstream,
    /// The local commit being replayed (rebase).
    Replayed,
}

impl ConflictSide {
    /// Index stage holding this side's content (2 = ours, 3 = theirs).
    ///
    /// During a rebase the engine treats the commit being rebased onto as
    /// "ours", so upstream content sits in stage 2.
    pub fn index_stage(&self) -> i32 {
        match self {
            ConflictSide::Local | ConflictSide::Upstream => 2,
            ConflictSide::Incoming | ConflictSide::Replayed => 3,
        }
    }
}

impl ConflictResolution {
    /// Map the request to a content side for the given state.
    ///
    /// Returns `None` when no conflict resolution applies to `state`.
    ///
    /// # Example
    ///
    /// ```
    /// use repoflow::core::types::{ConflictResolution, ConflictSide, RepositoryState};
    ///
    /// let mine = ConflictResolution::ResolveUsingMine;
    /// assert_eq!(mine.side_for(RepositoryState::Merging), Some(ConflictSide::Local));
    /// assert_eq!(mine.side_for(RepositoryState::RebasingMerge), Some(ConflictSide::Upstream));
    /// assert_eq!(mine.side_for(RepositoryState::Safe), None);
    /// ```
    pub fn side_for(&self, state: RepositoryState) -> Option<ConflictSide> {
        match (state, self) {
            (RepositoryState::Merging | RepositoryState::MergingResolved, Self::ResolveUsingMine) => {
                Some(ConflictSide::Local)
            }
            (
                RepositoryState::Merging | RepositoryState::MergingResolved,
                Self::ResolveUsingTheirs,
            ) => Some(ConflictSide::Incoming),
            (RepositoryState::RebasingMerge, Self::ResolveUsingMine) => Some(ConflictSide::Upstream),
            (RepositoryState::RebasingMerge, Self::ResolveUsingTheirs) => {
                Some(ConflictSide::Replayed)
            }
            _ => None,
        }
    }
}

/// How far a reset rewinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResetMode {
    /// Move the branch only.
    Soft,
    /// Move the branch and reset the index.
    Mixed,
    /// Move the branch, reset the index and the working tree.
    Hard,
}

/// One entry of the stash list, newest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StashEntry {
    /// Position in the stash list (`stash@{index}`).
    pub index: usize,
    pub message: String,
    pub oid: Oid,
}

/// Local-only and remote-only commit counts against the upstream branch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AheadBehind {
    pub ahead: usize,
    pub behind: usize,
}

// =============================================================================
// Responses
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PullStatus {
    Ok,
    UpToDate,
    Conflicts,
    Rejected,
}

/// Result of a pull.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullResponse {
    pub status: PullStatus,
    pub message: Option<MessageKey>,
    pub conflicting_paths: Vec<String>,
}

impl PullResponse {
    pub fn ok() -> Self {
        Self::with_status(PullStatus::Ok)
    }

    pub fn up_to_date() -> Self {
        Self::with_status(PullStatus::UpToDate)
    }

    /// Conflicts reported by the engine during integration.
    pub fn conflicts(paths: Vec<String>) -> Self {
        Self {
            status: PullStatus::Conflicts,
            message: Some(MessageKey::PullWithConflicts),
            conflicting_paths: paths,
        }
    }

    /// A pull refused before any integration was attempted.
    pub fn refused(status: PullStatus, key: MessageKey, paths: Vec<String>) -> Self {
        Self {
            status,
            message: Some(key),
            conflicting_paths: paths,
        }
    }

    fn with_status(status: PullStatus) -> Self {
        Self {
            status,
            message: None,
            conflicting_paths: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PushStatus {
    Ok,
    UpToDate,
    RejectedNonFastForward,
    RejectedOtherReason,
}

/// Result of a push.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushResponse {
    pub status: PushStatus,
    pub message: Option<String>,
}

impl PushResponse {
    pub fn new(status: PushStatus, message: Option<String>) -> Self {
        Self { status, message }
    }

    /// Check if the remote refused the update.
    pub fn is_rejected(&self) -> bool {
        matches!(
            self.status,
            PushStatus::RejectedNonFastForward | PushStatus::RejectedOtherReason
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationStatus {
    Completed,
    Conflicts,
}

/// Result of an operation that may stop on a conflict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationResponse {
    pub status: OperationStatus,
    /// Repository state after the operation.
    pub state: RepositoryState,
    pub conflicting_paths: Vec<String>,
}

impl OperationResponse {
    pub fn completed(state: RepositoryState) -> Self {
        Self {
            status: OperationStatus::Completed,
            state,
            conflicting_paths: Vec::new(),
        }
    }

    pub fn conflicts(state: RepositoryState, paths: Vec<String>) -> Self {
        Self {
            status: OperationStatus::Conflicts,
            state,
            conflicting_paths: paths,
        }
    }

    pub fn has_conflicts(&self) -> bool {
        self.status == OperationStatus::Conflicts
    }
}
