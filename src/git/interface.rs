//! git::interface
//!
//! The [`Git`] handle and its read-side queries: state, status, refs,
//! upstream tracking, history. Mutations (`porcelain.rs`), transport
//! (`remote.rs`) and submodules (`submodule.rs`) are further `impl Git`
//! blocks over the same repository.
//!
//! Failures come back as [`GitError`]; see `error.rs` for how libgit2
//! codes are folded.
//!
//! ```ignore
//! use repoflow::git::Git;
//! use std::path::Path;
//!
//! let git = Git::open(Path::new("."))?;
//! println!("state: {}", git.state()?);
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use super::error::GitError;
use crate::core::types::{
    AheadBehind, BranchName, ChangeType, FileStatus, GitStatus, Oid, RepositoryState,
};

/// Where a working copy lives on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoInfo {
    pub git_dir: PathBuf,
    pub work_dir: PathBuf,
}

/// One history entry, as shown by `log`.
#[derive(Debug, Clone, serde::Serialize)]
pub struct CommitInfo {
    pub oid: Oid,
    pub summary: String,
    pub message: String,
    pub author_name: String,
    pub author_email: String,
    pub author_time: chrono::DateTime<chrono::Utc>,
}

/// The upstream a branch integrates with, e.g. `origin`,
/// `refs/heads/main`, `refs/remotes/origin/main`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upstream {
    pub remote: String,
    pub merge_ref: String,
    pub tracking_ref: String,
}

/// A path changed between two trees; `added` when the old tree lacked it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeChange {
    pub path: String,
    pub added: bool,
}

/// An open working copy. Nothing outside `crate::git` touches `git2`.
pub struct Git {
    pub(super) repo: git2::Repository,
}

impl std::fmt::Debug for Git {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Git({})", self.repo.path().display())
    }
}

impl Git {
    /// Discover the repository containing `path`.
    ///
    /// Bare repositories are refused: every operation here needs a
    /// working tree.
    pub fn open(path: &Path) -> Result<Self, GitError> {
        let not_a_work_tree = || GitError::NotAWorkTree {
            path: path.to_path_buf(),
        };
        let repo = git2::Repository::discover(path).map_err(|_| not_a_work_tree())?;
        match repo.workdir() {
            Some(_) => Ok(Self { repo }),
            None => Err(not_a_work_tree()),
        }
    }

    pub fn info(&self) -> Result<RepoInfo, GitError> {
        Ok(RepoInfo {
            git_dir: self.git_dir().to_path_buf(),
            work_dir: self.work_dir()?.to_path_buf(),
        })
    }

    /// The per-worktree git directory (`.git`, or `.git/worktrees/<name>`).
    pub fn git_dir(&self) -> &Path {
        self.repo.path()
    }

    /// The git directory shared by all worktrees of this repository.
    pub fn common_dir(&self) -> &Path {
        self.repo.commondir()
    }

    pub fn work_dir(&self) -> Result<&Path, GitError> {
        self.repo.workdir().ok_or_else(|| GitError::NotAWorkTree {
            path: self.git_dir().to_path_buf(),
        })
    }

    // locks

    /// Fail with [`GitError::Locked`] if an index or HEAD lock file exists.
    ///
    /// libgit2 only notices a stale lock when it tries to write the locked
    /// file, which several porcelain commands never do before touching the
    /// working tree. Checking up front gives every mutation the same answer.
    pub fn ensure_unlocked(&self) -> Result<(), GitError> {
        for name in ["index.lock", "HEAD.lock"] {
            let path = self.repo.path().join(name);
            if path.exists() {
                return Err(GitError::Locked {
                    message: format!("unable to create '{}': file exists", path.display()),
                    path: Some(path),
                });
            }
        }
        Ok(())
    }

    // state detection

    /// Get the repository state.
    ///
    /// A merge is `Merging` while the index has conflicts and
    /// `MergingResolved` once they are all staged.
    pub fn state(&self) -> Result<RepositoryState, GitError> {
        let state = match self.repo.state() {
            git2::RepositoryState::Clean => RepositoryState::Safe,
            git2::RepositoryState::Merge => {
                if self.has_conflicts()? {
                    RepositoryState::Merging
                } else {
                    RepositoryState::MergingResolved
                }
            }
            git2::RepositoryState::RebaseMerge | git2::RepositoryState::RebaseInteractive => {
                RepositoryState::RebasingMerge
            }
            _ => RepositoryState::Other,
        };
        Ok(state)
    }

    /// The index, reloaded if another process rewrote it.
    pub(super) fn fresh_index(&self) -> Result<git2::Index, GitError> {
        let mut index = self.repo.index().map_err(|e| GitError::from_git2(e, "index"))?;
        index
            .read(false)
            .map_err(|e| GitError::from_git2(e, "index"))?;
        Ok(index)
    }

    /// Pick up index changes made outside this handle.
    ///
    /// libgit2 keeps the index it loaded at open time; anything another
    /// process wrote since is invisible until it is re-read.
    pub fn refresh_index(&self) -> Result<(), GitError> {
        self.fresh_index().map(drop)
    }

    /// Check if there are unresolved conflicts in the index.
    pub fn has_conflicts(&self) -> Result<bool, GitError> {
        let index = self.fresh_index()?;
        Ok(index.has_conflicts())
    }

    /// Sorted, de-duplicated list of conflicted paths.
    pub fn conflicting_paths(&self) -> Result<Vec<String>, GitError> {
        let index = self.fresh_index()?;
        if !index.has_conflicts() {
            return Ok(Vec::new());
        }

        let mut paths = Vec::new();
        for conflict in index.conflicts()? {
            let conflict = conflict?;
            let entry = conflict
                .our
                .as_ref()
                .or(conflict.their.as_ref())
                .or(conflict.ancestor.as_ref());
            if let Some(entry) = entry {
                paths.push(String::from_utf8_lossy(&entry.path).into_owned());
            }
        }
        paths.sort();
        paths.dedup();
        Ok(paths)
    }

    /// Commits recorded in `MERGE_HEAD`.
    pub(super) fn merge_heads(&self) -> Result<Vec<git2::Oid>, GitError> {
        let path = self.repo.path().join("MERGE_HEAD");
        let contents = match fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(GitError::Io { path, source: e }),
        };

        contents
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(|l| git2::Oid::from_str(l).map_err(|e| GitError::from_git2(e, l)))
            .collect()
    }

    /// Message prepared by the engine for a pending merge commit.
    pub fn prepared_merge_message(&self) -> Option<String> {
        fs::read_to_string(self.repo.path().join("MERGE_MSG"))
            .ok()
            .filter(|m| !m.trim().is_empty())
    }

    // working tree status

    /// Compute the staged/unstaged status snapshot.
    ///
    /// Conflicted paths are reported once, on the unstaged side.
    pub fn status(&self, include_untracked: bool) -> Result<GitStatus, GitError> {
        let mut opts = git2::StatusOptions::new();
        opts.include_untracked(include_untracked)
            .recurse_untracked_dirs(include_untracked)
            .include_ignored(false);

        let statuses = self
            .repo
            .statuses(Some(&mut opts))
            .map_err(|e| GitError::from_git2(e, "status"))?;

        let mut staged = Vec::new();
        let mut unstaged = Vec::new();

        for entry in statuses.iter() {
            let Some(path) = entry.path() else {
                continue; // Non-UTF8 path
            };
            let status = entry.status();

            if status.is_conflicted() {
                unstaged.push(FileStatus::new(ChangeType::Conflict, path));
                continue;
            }

            if status.is_index_new() {
                staged.push(FileStatus::new(ChangeType::Add, path));
            } else if status.is_index_deleted() {
                staged.push(FileStatus::new(ChangeType::Removed, path));
            } else if status.is_index_modified()
                || status.is_index_renamed()
                || status.is_index_typechange()
            {
                staged.push(FileStatus::new(ChangeType::Changed, path));
            }

            if status.is_wt_new() {
                unstaged.push(FileStatus::new(ChangeType::Untracked, path));
            } else if status.is_wt_deleted() {
                unstaged.push(FileStatus::new(ChangeType::Missing, path));
            } else if status.is_wt_modified() || status.is_wt_renamed() || status.is_wt_typechange()
            {
                unstaged.push(FileStatus::new(ChangeType::Modified, path));
            }
        }

        Ok(GitStatus::new(staged, unstaged))
    }

    // ref resolution

    /// The commit `refname` points at, or `None` when the ref is absent.
    pub fn try_resolve_ref(&self, refname: &str) -> Result<Option<Oid>, GitError> {
        match self.resolve_ref_raw(refname) {
            Ok(id) => Ok(Some(from_git2_oid(id)?)),
            Err(GitError::RefNotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub(super) fn resolve_ref_raw(&self, refname: &str) -> Result<git2::Oid, GitError> {
        let commit = self
            .repo
            .find_reference(refname)
            .and_then(|r| r.peel_to_commit())
            .map_err(|e| GitError::from_git2(e, refname))?;
        Ok(commit.id())
    }

    /// HEAD's commit; [`GitError::RefNotFound`] before the first commit.
    pub fn head_oid(&self) -> Result<Oid, GitError> {
        from_git2_oid(self.head_commit()?.id())
    }

    pub(super) fn head_commit(&self) -> Result<git2::Commit<'_>, GitError> {
        self.repo
            .head()
            .and_then(|h| h.peel_to_commit())
            .map_err(|e| GitError::from_git2(e, "HEAD"))
    }

    pub(super) fn find_commit(&self, oid: &Oid) -> Result<git2::Commit<'_>, GitError> {
        let id = to_git2_oid(oid)?;
        self.repo
            .find_commit(id)
            .map_err(|e| GitError::from_git2(e, oid.as_str()))
    }

    /// The checked-out branch; `None` on a detached or unborn HEAD.
    pub fn current_branch(&self) -> Result<Option<BranchName>, GitError> {
        let head = match self.repo.head() {
            Ok(head) if head.is_branch() => head,
            Ok(_) => return Ok(None),
            Err(e) if e.code() == git2::ErrorCode::UnbornBranch => return Ok(None),
            Err(e) => return Err(GitError::from_git2(e, "HEAD")),
        };
        head.shorthand()
            .map(BranchName::new)
            .transpose()
            .map_err(GitError::from)
    }

    /// List all local branches.
    pub fn list_branches(&self) -> Result<Vec<BranchName>, GitError> {
        let branches = self
            .repo
            .branches(Some(git2::BranchType::Local))
            .map_err(|e| GitError::from_git2(e, "branches"))?;

        let mut names = Vec::new();
        for branch in branches {
            let (branch, _) = branch?;
            if let Some(name) = branch.name().ok().flatten() {
                if let Ok(branch_name) = BranchName::new(name) {
                    names.push(branch_name);
                }
            }
        }
        names.sort();
        Ok(names)
    }

    /// List tag names.
    pub fn list_tags(&self) -> Result<Vec<String>, GitError> {
        let names = self
            .repo
            .tag_names(None)
            .map_err(|e| GitError::from_git2(e, "tags"))?;
        Ok(names.iter().flatten().map(String::from).collect())
    }

    // upstream and ancestry

    /// Resolve the upstream of the current branch.
    ///
    /// Uses the branch's tracking configuration; without it, falls back to
    /// the same-named branch on `fallback_remote` if that remote exists.
    /// Returns `None` on a detached HEAD or when there is nothing to track.
    pub fn upstream(&self, fallback_remote: &str) -> Result<Option<Upstream>, GitError> {
        let Some(branch) = self.current_branch()? else {
            return Ok(None);
        };
        let local_ref = branch.local_ref();

        let configured = (
            self.repo.branch_upstream_remote(&local_ref),
            self.repo.branch_upstream_merge(&local_ref),
        );
        if let (Ok(remote), Ok(merge_ref)) = configured {
            let remote = remote.as_str().unwrap_or(fallback_remote).to_string();
            let merge_ref = merge_ref.as_str().unwrap_or(&local_ref).to_string();
            let short = merge_ref.strip_prefix("refs/heads/").unwrap_or(&merge_ref);
            let tracking_ref = format!("refs/remotes/{}/{}", remote, short);
            return Ok(Some(Upstream {
                remote,
                merge_ref,
                tracking_ref,
            }));
        }

        if self.repo.find_remote(fallback_remote).is_err() {
            return Ok(None);
        }

        Ok(Some(Upstream {
            remote: fallback_remote.to_string(),
            tracking_ref: format!("refs/remotes/{}/{}", fallback_remote, branch),
            merge_ref: local_ref,
        }))
    }

    /// Ahead/behind counts of HEAD against the upstream tracking ref.
    ///
    /// Returns `None` when there is no upstream or it was never fetched.
    pub fn ahead_behind(&self, fallback_remote: &str) -> Result<Option<AheadBehind>, GitError> {
        let Some(upstream) = self.upstream(fallback_remote)? else {
            return Ok(None);
        };
        let Ok(remote_oid) = self.resolve_ref_raw(&upstream.tracking_ref) else {
            return Ok(None);
        };
        let local_oid = self.head_commit()?.id();

        let (ahead, behind) = self
            .repo
            .graph_ahead_behind(local_oid, remote_oid)
            .map_err(|e| GitError::from_git2(e, "ahead/behind"))?;

        Ok(Some(AheadBehind { ahead, behind }))
    }

    /// Common ancestor of two commits; `None` for unrelated histories.
    pub fn merge_base(&self, left: &Oid, right: &Oid) -> Result<Option<Oid>, GitError> {
        match self.repo.merge_base(to_git2_oid(left)?, to_git2_oid(right)?) {
            Ok(base) => from_git2_oid(base).map(Some),
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(None),
            Err(e) => Err(GitError::from_git2(e, "merge-base")),
        }
    }

    /// Whether `ancestor` is reachable from `descendant`; a commit counts
    /// as its own ancestor.
    pub fn is_ancestor(&self, ancestor: &Oid, descendant: &Oid) -> Result<bool, GitError> {
        if ancestor == descendant {
            return Ok(true);
        }
        self.repo
            .graph_descendant_of(to_git2_oid(descendant)?, to_git2_oid(ancestor)?)
            .map_err(|e| GitError::from_git2(e, "is-ancestor"))
    }

    /// Paths whose content differs between the trees of two commits.
    pub fn changed_paths(&self, from: &Oid, to: &Oid) -> Result<Vec<TreeChange>, GitError> {
        let old_tree = self.find_commit(from)?.tree()?;
        let new_tree = self.find_commit(to)?.tree()?;

        let diff = self
            .repo
            .diff_tree_to_tree(Some(&old_tree), Some(&new_tree), None)
            .map_err(|e| GitError::from_git2(e, "diff"))?;

        let mut changes = Vec::new();
        for delta in diff.deltas() {
            let added = delta.status() == git2::Delta::Added;
            for file in [delta.old_file(), delta.new_file()] {
                if let Some(path) = file.path().and_then(Path::to_str) {
                    changes.push(TreeChange {
                        path: path.to_string(),
                        added,
                    });
                }
            }
        }
        changes.sort_by(|a, b| a.path.cmp(&b.path));
        changes.dedup_by(|a, b| a.path == b.path);
        Ok(changes)
    }

    // history

    /// Walk history from HEAD, newest first.
    pub fn history(&self, limit: usize) -> Result<Vec<CommitInfo>, GitError> {
        let mut revwalk = self
            .repo
            .revwalk()
            .map_err(|e| GitError::from_git2(e, "revwalk"))?;
        revwalk.set_sorting(git2::Sort::TIME)?;
        match revwalk.push_head() {
            Ok(()) => {}
            Err(e) if e.code() == git2::ErrorCode::UnbornBranch => return Ok(Vec::new()),
            Err(e) => return Err(GitError::from_git2(e, "HEAD")),
        }

        let mut commits = Vec::new();
        for id in revwalk.take(limit) {
            let oid = Oid::new(id?.to_string())?;
            commits.push(self.commit_info(&oid)?);
        }
        Ok(commits)
    }

    /// Summary, message and author of one commit.
    pub fn commit_info(&self, oid: &Oid) -> Result<CommitInfo, GitError> {
        let commit = self.find_commit(oid)?;
        let author = commit.author();
        let text = |field: Option<&str>| field.unwrap_or_default().to_string();

        Ok(CommitInfo {
            oid: oid.clone(),
            summary: text(commit.summary()),
            message: text(commit.message()),
            author_name: text(author.name()),
            author_email: text(author.email()),
            author_time: chrono::DateTime::from_timestamp(author.when().seconds(), 0)
                .unwrap_or(chrono::DateTime::UNIX_EPOCH),
        })
    }

    // identity

    /// Signature from the repository configuration.
    pub(super) fn signature(&self) -> Result<git2::Signature<'static>, GitError> {
        match self.repo.signature() {
            Ok(sig) => Ok(sig.to_owned()),
            Err(e) if e.code() == git2::ErrorCode::NotFound => {
                log::warn!("no user.name/user.email configured, using a placeholder identity");
                git2::Signature::now("repoflow", "repoflow@localhost")
                    .map_err(|e| GitError::from_git2(e, "signature"))
            }
            Err(e) => Err(GitError::from_git2(e, "signature")),
        }
    }
}

/// Convert a validated OID into a git2 OID.
pub(super) fn to_git2_oid(oid: &Oid) -> Result<git2::Oid, GitError> {
    git2::Oid::from_str(oid.as_str()).map_err(|e| GitError::from_git2(e, oid.as_str()))
}

/// Convert a git2 OID into a validated OID.
pub(super) fn from_git2_oid(oid: git2::Oid) -> Result<Oid, GitError> {
    Ok(Oid::new(oid.to_string())?)
}
