//! git
//!
//! Single interface for all Git operations.
//!
//! # Architecture
//!
//! This module is the **ONLY doorway** to Git. All repository reads and writes
//! flow through [`Git`]. No other module imports `git2`; everything above
//! this layer sees strong types from [`crate::core::types`].
//!
//! We use the `git2` crate exclusively (no shelling out to the git CLI).
//!
//! # Responsibilities
//!
//! - Repository discovery and opening
//! - State detection and the status snapshot
//! - Upstream resolution and ancestry queries
//! - Porcelain: commit, index, checkout, stash, reset, revert, tags
//! - Merge and rebase integration, conflict sides, restart
//! - Fetch, push and submodule update
//!
//! # Example
//!
//! ```ignore
//! use repoflow::git::Git;
//! use std::path::Path;
//!
//! let git = Git::open(Path::new("."))?;
//! let status = git.status(true)?;
//! for file in &status.unstaged_files {
//!     println!("{} {}", file.change_type, file.path);
//! }
//! ```

mod error;
mod interface;
mod porcelain;
mod remote;
mod submodule;

pub use error::GitError;
pub use interface::{CommitInfo, Git, RepoInfo, TreeChange, Upstream};
pub use porcelain::{MergeOutcome, RebaseOutcome};
pub use remote::PushOutcome;
