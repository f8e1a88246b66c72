//! git::porcelain
//!
//! Mutating repository operations: commits, index edits, checkout, stash,
//! reset, revert, tags, merge and rebase integration, and conflict sides.
//!
//! None of these refresh anything outside the repository; callers own
//! status invalidation and event emission.

use std::fs;
use std::path::Path;

use git2::build::CheckoutBuilder;

use super::error::GitError;
use super::interface::{from_git2_oid, Git};
use crate::core::types::{BranchName, Oid, ResetMode, StashEntry};

/// Outcome of integrating an upstream ref by merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    /// Upstream is already contained in HEAD.
    UpToDate,
    /// HEAD moved forward to upstream.
    FastForward,
    /// A merge commit was recorded.
    Merged(Oid),
    /// The merge stopped on conflicts.
    Conflicts(Vec<String>),
}

/// Outcome of starting or continuing a rebase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RebaseOutcome {
    /// All commits were replayed and the rebase finished.
    Completed,
    /// Replaying a commit stopped on conflicts.
    Conflicts(Vec<String>),
}

impl Git {
    // =========================================================================
    // Commit and Index
    // =========================================================================

    /// Record the index as a new commit on HEAD.
    ///
    /// While a merge is pending the commit gets the merged-in heads as
    /// extra parents and the merge state is cleaned up.
    ///
    /// # Errors
    ///
    /// - [`GitError::UnresolvedConflicts`] if the index still has conflicts
    pub fn commit(&self, message: &str) -> Result<Oid, GitError> {
        let mut index = self.fresh_index()?;
        if index.has_conflicts() {
            return Err(GitError::UnresolvedConflicts {
                paths: self.conflicting_paths()?,
            });
        }

        let tree_id = index
            .write_tree()
            .map_err(|e| GitError::from_git2(e, "write tree"))?;
        let tree = self.repo.find_tree(tree_id)?;
        let sig = self.signature()?;

        let mut parents = Vec::new();
        match self.head_commit() {
            Ok(head) => parents.push(head),
            Err(GitError::RefNotFound { .. }) => {} // Initial commit
            Err(e) => return Err(e),
        }
        for id in self.merge_heads()? {
            parents.push(self.repo.find_commit(id)?);
        }
        let parent_refs: Vec<&git2::Commit<'_>> = parents.iter().collect();

        let oid = self
            .repo
            .commit(Some("HEAD"), &sig, &sig, message, &tree, &parent_refs)
            .map_err(|e| GitError::from_git2(e, "commit"))?;

        if matches!(
            self.repo.state(),
            git2::RepositoryState::Merge
                | git2::RepositoryState::Revert
                | git2::RepositoryState::CherryPick
        ) {
            self.repo.cleanup_state()?;
        }

        from_git2_oid(oid)
    }

    /// Stage paths; deleted files are removed from the index.
    pub fn stage(&self, paths: &[String]) -> Result<(), GitError> {
        let work_dir = self.work_dir()?.to_path_buf();
        let mut index = self.fresh_index()?;

        for path in paths {
            let rel = Path::new(path);
            if work_dir.join(rel).exists() {
                index
                    .add_path(rel)
                    .map_err(|e| GitError::from_git2(e, path))?;
            } else {
                index
                    .remove_path(rel)
                    .map_err(|e| GitError::from_git2(e, path))?;
            }
        }

        index.write().map_err(|e| GitError::from_git2(e, "index"))
    }

    /// Reset index entries for paths back to HEAD.
    pub fn unstage(&self, paths: &[String]) -> Result<(), GitError> {
        match self.head_commit() {
            Ok(head) => self
                .repo
                .reset_default(Some(head.as_object()), paths.iter().map(String::as_str))
                .map_err(|e| GitError::from_git2(e, "unstage")),
            Err(GitError::RefNotFound { .. }) => {
                let mut index = self.fresh_index()?;
                for path in paths {
                    index
                        .remove_path(Path::new(path))
                        .map_err(|e| GitError::from_git2(e, path))?;
                }
                index.write().map_err(|e| GitError::from_git2(e, "index"))
            }
            Err(e) => Err(e),
        }
    }

    // =========================================================================
    // Checkout and Branches
    // =========================================================================

    /// Switch to a local branch, keeping local edits that do not collide.
    ///
    /// # Errors
    ///
    /// - [`GitError::Conflict`] listing the paths whose local edits block it
    pub fn checkout_branch(&self, name: &BranchName) -> Result<(), GitError> {
        let refname = name.local_ref();
        let target = self
            .repo
            .revparse_single(&refname)
            .map_err(|e| GitError::from_git2(e, &refname))?;

        self.checkout_tree_safe(&target)?;
        self.repo
            .set_head(&refname)
            .map_err(|e| GitError::from_git2(e, &refname))
    }

    /// Create a branch at `start` (HEAD if `None`) and switch to it.
    pub fn checkout_new_branch(
        &self,
        name: &BranchName,
        start: Option<&Oid>,
    ) -> Result<(), GitError> {
        self.create_branch(name, start)?;
        self.checkout_branch(name)
    }

    /// Detach HEAD at a commit.
    pub fn checkout_commit(&self, oid: &Oid) -> Result<(), GitError> {
        let commit = self.find_commit(oid)?;
        self.checkout_tree_safe(commit.as_object())?;
        self.repo
            .set_head_detached(commit.id())
            .map_err(|e| GitError::from_git2(e, oid.as_str()))
    }

    /// Discard local edits on paths, restoring the HEAD version.
    pub fn restore_paths(&self, paths: &[String]) -> Result<(), GitError> {
        let mut builder = CheckoutBuilder::new();
        builder.force();
        for path in paths {
            builder.path(path.as_str());
        }
        self.repo
            .checkout_head(Some(&mut builder))
            .map_err(|e| GitError::from_git2(e, "restore"))
    }

    /// Create a local branch at `start` (HEAD if `None`).
    pub fn create_branch(&self, name: &BranchName, start: Option<&Oid>) -> Result<(), GitError> {
        let commit = match start {
            Some(oid) => self.find_commit(oid)?,
            None => self.head_commit()?,
        };
        self.repo
            .branch(name.as_str(), &commit, false)
            .map_err(|e| GitError::from_git2(e, name.as_str()))?;
        Ok(())
    }

    /// Delete a local branch.
    pub fn delete_branch(&self, name: &BranchName) -> Result<(), GitError> {
        let mut branch = self
            .repo
            .find_branch(name.as_str(), git2::BranchType::Local)
            .map_err(|e| GitError::from_git2(e, &name.local_ref()))?;
        branch
            .delete()
            .map_err(|e| GitError::from_git2(e, name.as_str()))
    }

    /// Check out a tree, collecting the paths that block it.
    fn checkout_tree_safe(&self, target: &git2::Object<'_>) -> Result<(), GitError> {
        let mut blocked: Vec<String> = Vec::new();
        let result = {
            let mut builder = CheckoutBuilder::new();
            builder
                .safe()
                .notify_on(git2::CheckoutNotificationType::CONFLICT)
                .notify(|_, path, _, _, _| {
                    if let Some(p) = path {
                        blocked.push(p.to_string_lossy().replace('\\', "/"));
                    }
                    true
                });
            self.repo.checkout_tree(target, Some(&mut builder))
        };

        match result {
            Ok(()) => Ok(()),
            Err(e) if e.code() == git2::ErrorCode::Conflict || !blocked.is_empty() => {
                blocked.sort();
                blocked.dedup();
                Err(GitError::Conflict {
                    message: e.message().to_string(),
                    paths: blocked,
                })
            }
            Err(e) => Err(GitError::from_git2(e, "checkout")),
        }
    }

    // =========================================================================
    // Stash
    // =========================================================================

    /// Stash local changes. Returns `None` when there was nothing to stash.
    pub fn stash_save(
        &mut self,
        message: Option<&str>,
        include_untracked: bool,
    ) -> Result<Option<Oid>, GitError> {
        let sig = self.signature()?;
        let flags = if include_untracked {
            git2::StashFlags::INCLUDE_UNTRACKED
        } else {
            git2::StashFlags::DEFAULT
        };

        match self.repo.stash_save2(&sig, message, Some(flags)) {
            Ok(oid) => Ok(Some(from_git2_oid(oid)?)),
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(None),
            Err(e) => Err(GitError::from_git2(e, "stash")),
        }
    }

    /// Apply a stash entry, keeping it. Returns paths left in conflict.
    pub fn stash_apply(&mut self, index: usize) -> Result<Vec<String>, GitError> {
        let mut checkout = CheckoutBuilder::new();
        checkout.safe().allow_conflicts(true).conflict_style_merge(true);
        let mut opts = git2::StashApplyOptions::new();
        opts.checkout_options(checkout);

        match self.repo.stash_apply(index, Some(&mut opts)) {
            Ok(()) => self.conflicting_paths(),
            Err(e)
                if matches!(
                    e.code(),
                    git2::ErrorCode::Conflict | git2::ErrorCode::MergeConflict
                ) =>
            {
                let paths = self.conflicting_paths()?;
                if paths.is_empty() {
                    Err(GitError::Conflict {
                        message: e.message().to_string(),
                        paths,
                    })
                } else {
                    Ok(paths)
                }
            }
            Err(e) => Err(GitError::from_git2(e, "stash apply")),
        }
    }

    /// Apply a stash entry and drop it unless it left conflicts.
    pub fn stash_pop(&mut self, index: usize) -> Result<Vec<String>, GitError> {
        let conflicts = self.stash_apply(index)?;
        if conflicts.is_empty() {
            self.stash_drop(index)?;
        } else {
            log::info!("stash@{{{}}} kept: applying it left conflicts", index);
        }
        Ok(conflicts)
    }

    /// Drop a stash entry.
    pub fn stash_drop(&mut self, index: usize) -> Result<(), GitError> {
        self.repo
            .stash_drop(index)
            .map_err(|e| GitError::from_git2(e, "stash drop"))
    }

    /// List stash entries, newest first.
    pub fn stash_list(&mut self) -> Result<Vec<StashEntry>, GitError> {
        let mut raw = Vec::new();
        self.repo
            .stash_foreach(|index, message, oid| {
                raw.push((index, message.to_string(), *oid));
                true
            })
            .map_err(|e| GitError::from_git2(e, "stash list"))?;

        raw.into_iter()
            .map(|(index, message, oid)| {
                Ok(StashEntry {
                    index,
                    message,
                    oid: from_git2_oid(oid)?,
                })
            })
            .collect()
    }

    // =========================================================================
    // Reset, Revert, Tags
    // =========================================================================

    /// Reset HEAD to a commit.
    pub fn reset(&self, oid: &Oid, mode: ResetMode) -> Result<(), GitError> {
        let commit = self.find_commit(oid)?;
        let kind = match mode {
            ResetMode::Soft => git2::ResetType::Soft,
            ResetMode::Mixed => git2::ResetType::Mixed,
            ResetMode::Hard => git2::ResetType::Hard,
        };
        self.repo
            .reset(commit.as_object(), kind, None)
            .map_err(|e| GitError::from_git2(e, "reset"))
    }

    /// Revert a commit and record the result.
    ///
    /// Returns the conflicted paths if the revert could not be applied
    /// cleanly; the revert is then left in progress for the user.
    pub fn revert(&self, oid: &Oid) -> Result<Vec<String>, GitError> {
        let commit = self.find_commit(oid)?;
        self.repo
            .revert(&commit, None)
            .map_err(|e| GitError::from_git2(e, "revert"))?;

        let conflicts = self.conflicting_paths()?;
        if !conflicts.is_empty() {
            return Ok(conflicts);
        }

        let message = format!(
            "Revert \"{}\"\n\nThis reverts commit {}.\n",
            commit.summary().unwrap_or(""),
            oid
        );
        self.commit(&message)?;
        Ok(Vec::new())
    }

    /// Create a tag at `target` (HEAD if `None`); annotated when a message
    /// is given.
    pub fn create_tag(
        &self,
        name: &str,
        target: Option<&Oid>,
        message: Option<&str>,
    ) -> Result<(), GitError> {
        let commit = match target {
            Some(oid) => self.find_commit(oid)?,
            None => self.head_commit()?,
        };

        match message {
            Some(msg) => {
                let sig = self.signature()?;
                self.repo.tag(name, commit.as_object(), &sig, msg, false)
            }
            None => self.repo.tag_lightweight(name, commit.as_object(), false),
        }
        .map_err(|e| GitError::from_git2(e, name))?;
        Ok(())
    }

    /// Delete a tag.
    pub fn delete_tag(&self, name: &str) -> Result<(), GitError> {
        self.repo
            .tag_delete(name)
            .map_err(|e| GitError::from_git2(e, &format!("refs/tags/{}", name)))
    }

    // =========================================================================
    // Merge
    // =========================================================================

    /// Merge the commit at `upstream_ref` into HEAD.
    ///
    /// Fast-forwards when possible. A clean non-ff merge is committed with
    /// the engine's prepared message; conflicts leave the merge in progress.
    pub fn merge_ref(&self, upstream_ref: &str) -> Result<MergeOutcome, GitError> {
        let reference = self
            .repo
            .find_reference(upstream_ref)
            .map_err(|e| GitError::from_git2(e, upstream_ref))?;
        let incoming = self.repo.reference_to_annotated_commit(&reference)?;
        let (analysis, _) = self
            .repo
            .merge_analysis(&[&incoming])
            .map_err(|e| GitError::from_git2(e, "merge analysis"))?;

        if analysis.is_up_to_date() {
            return Ok(MergeOutcome::UpToDate);
        }

        if analysis.is_fast_forward() {
            let target = self.repo.find_object(incoming.id(), None)?;
            self.checkout_tree_safe(&target)?;
            let mut head = self.repo.head()?;
            if head.is_branch() {
                head.set_target(incoming.id(), "pull: fast-forward")
                    .map_err(|e| GitError::from_git2(e, "HEAD"))?;
            } else {
                self.repo.set_head_detached(incoming.id())?;
            }
            return Ok(MergeOutcome::FastForward);
        }

        let mut checkout = Self::conflict_checkout();
        self.repo
            .merge(&[&incoming], None, Some(&mut checkout))
            .map_err(|e| GitError::from_git2(e, "merge"))?;

        let conflicts = self.conflicting_paths()?;
        if !conflicts.is_empty() {
            return Ok(MergeOutcome::Conflicts(conflicts));
        }

        let message = self
            .prepared_merge_message()
            .unwrap_or_else(|| format!("Merge {}", upstream_ref));
        Ok(MergeOutcome::Merged(self.commit(&message)?))
    }

    /// Discard a pending merge, resetting to HEAD.
    pub fn abort_merge(&self) -> Result<(), GitError> {
        let head = self.head_commit()?;
        let mut checkout = CheckoutBuilder::new();
        checkout.force();
        self.repo
            .reset(head.as_object(), git2::ResetType::Hard, Some(&mut checkout))
            .map_err(|e| GitError::from_git2(e, "abort merge"))
    }

    /// Abort a revert or cherry-pick in progress, resetting to HEAD.
    /// Returns false if neither is in progress.
    pub fn abort_pick(&self) -> Result<bool, GitError> {
        if !matches!(
            self.repo.state(),
            git2::RepositoryState::Revert
                | git2::RepositoryState::RevertSequence
                | git2::RepositoryState::CherryPick
                | git2::RepositoryState::CherryPickSequence
        ) {
            return Ok(false);
        }

        self.abort_merge()?;
        self.repo.cleanup_state()?;
        Ok(true)
    }

    /// Put conflicted paths back to their HEAD version in index and tree.
    ///
    /// Other local edits are left alone.
    pub fn discard_conflicts(&self, paths: &[String]) -> Result<(), GitError> {
        if paths.is_empty() {
            return Ok(());
        }

        let mut index = self.fresh_index()?;
        for path in paths {
            match index.conflict_remove(Path::new(path)) {
                Ok(()) => {}
                Err(e) if e.code() == git2::ErrorCode::NotFound => {}
                Err(e) => return Err(GitError::from_git2(e, path)),
            }
        }
        index.write().map_err(|e| GitError::from_git2(e, "index"))?;

        self.unstage(paths)?;
        self.restore_paths(paths)
    }

    /// Throw away resolutions and redo the pending merge from scratch.
    pub fn restart_merge(&self) -> Result<Vec<String>, GitError> {
        let heads = self.merge_heads()?;
        if heads.is_empty() {
            return Err(GitError::RefNotFound {
                refname: "MERGE_HEAD".to_string(),
            });
        }
        let message = self.prepared_merge_message();

        self.abort_merge()?;

        let annotated = heads
            .iter()
            .map(|id| self.repo.find_annotated_commit(*id))
            .collect::<Result<Vec<_>, _>>()?;
        let refs: Vec<&git2::AnnotatedCommit<'_>> = annotated.iter().collect();

        let mut checkout = Self::conflict_checkout();
        self.repo
            .merge(&refs, None, Some(&mut checkout))
            .map_err(|e| GitError::from_git2(e, "merge"))?;

        if let Some(message) = message {
            let path = self.repo.path().join("MERGE_MSG");
            fs::write(&path, message).map_err(|e| GitError::Io { path, source: e })?;
        }

        self.conflicting_paths()
    }

    fn conflict_checkout() -> CheckoutBuilder<'static> {
        let mut checkout = CheckoutBuilder::new();
        checkout
            .safe()
            .allow_conflicts(true)
            .conflict_style_merge(true);
        checkout
    }

    // =========================================================================
    // Rebase
    // =========================================================================

    /// Rebase the current branch onto the commit at `upstream_ref`.
    pub fn rebase_onto(&self, upstream_ref: &str) -> Result<RebaseOutcome, GitError> {
        let reference = self
            .repo
            .find_reference(upstream_ref)
            .map_err(|e| GitError::from_git2(e, upstream_ref))?;
        let upstream = self.repo.reference_to_annotated_commit(&reference)?;
        let head = self.repo.head().map_err(|e| GitError::from_git2(e, "HEAD"))?;
        let branch = self.repo.reference_to_annotated_commit(&head)?;

        let mut opts = git2::RebaseOptions::new();
        opts.checkout_options(Self::conflict_checkout());
        let mut rebase = self
            .repo
            .rebase(Some(&branch), Some(&upstream), None, Some(&mut opts))
            .map_err(|e| GitError::from_git2(e, "rebase"))?;

        self.drive_rebase(&mut rebase)
    }

    /// Commit the resolved step and replay the remaining commits.
    ///
    /// # Errors
    ///
    /// - [`GitError::UnresolvedConflicts`] if the index is still conflicted
    pub fn continue_rebase(&self) -> Result<RebaseOutcome, GitError> {
        let conflicts = self.conflicting_paths()?;
        if !conflicts.is_empty() {
            return Err(GitError::UnresolvedConflicts { paths: conflicts });
        }

        let mut rebase = self
            .repo
            .open_rebase(None)
            .map_err(|e| GitError::from_git2(e, "rebase"))?;
        if rebase.operation_current().is_some() {
            self.commit_rebase_step(&mut rebase)?;
        }
        self.drive_rebase(&mut rebase)
    }

    /// Abort the rebase in progress. Returns false if there was none.
    pub fn abort_rebase(&self) -> Result<bool, GitError> {
        if !matches!(
            self.repo.state(),
            git2::RepositoryState::RebaseMerge | git2::RepositoryState::RebaseInteractive
        ) {
            return Ok(false);
        }

        let mut rebase = self
            .repo
            .open_rebase(None)
            .map_err(|e| GitError::from_git2(e, "rebase"))?;
        rebase
            .abort()
            .map_err(|e| GitError::from_git2(e, "abort rebase"))?;
        Ok(true)
    }

    /// Redo the conflicted rebase step from a clean tree.
    ///
    /// A hard reset would drop the rebase state, so the step is undone by
    /// hand: files the step added are removed, index and tree go back to
    /// HEAD, and the replayed commit is cherry-picked again.
    pub fn restart_rebase_step(&self) -> Result<Vec<String>, GitError> {
        let replayed = {
            let mut rebase = self
                .repo
                .open_rebase(None)
                .map_err(|e| GitError::from_git2(e, "rebase"))?;
            let current = rebase.operation_current().ok_or_else(|| GitError::Internal {
                message: "rebase has no current step".to_string(),
            })?;
            let op = rebase.nth(current).ok_or_else(|| GitError::Internal {
                message: format!("rebase step {} missing", current),
            })?;
            op.id()
        };
        let commit = self.repo.find_commit(replayed)?;

        let head = self.head_commit()?;
        let head_tree = head.tree()?;
        let work_dir = self.work_dir()?.to_path_buf();
        let mut index = self.fresh_index()?;

        let added: Vec<String> = index
            .iter()
            .map(|entry| String::from_utf8_lossy(&entry.path).into_owned())
            .filter(|path| head_tree.get_path(Path::new(path)).is_err())
            .collect();
        for path in added {
            let full = work_dir.join(&path);
            match fs::remove_file(&full) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(GitError::Io { path: full, source: e }),
            }
        }

        index.read_tree(&head_tree)?;
        index.write().map_err(|e| GitError::from_git2(e, "index"))?;

        let mut checkout = CheckoutBuilder::new();
        checkout.force();
        self.repo
            .checkout_head(Some(&mut checkout))
            .map_err(|e| GitError::from_git2(e, "checkout"))?;

        let mut opts = git2::CherrypickOptions::new();
        opts.checkout_builder(Self::conflict_checkout());
        self.repo
            .cherrypick(&commit, Some(&mut opts))
            .map_err(|e| GitError::from_git2(e, "cherry-pick"))?;

        // The step belongs to the rebase, not to a cherry-pick.
        for leftover in ["CHERRY_PICK_HEAD", "MERGE_MSG"] {
            let path = self.repo.path().join(leftover);
            match fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(GitError::Io { path, source: e }),
            }
        }

        self.conflicting_paths()
    }

    fn drive_rebase(&self, rebase: &mut git2::Rebase<'_>) -> Result<RebaseOutcome, GitError> {
        while let Some(step) = rebase.next() {
            if let Err(e) = step {
                let conflicts = self.conflicting_paths()?;
                if conflicts.is_empty() {
                    return Err(GitError::from_git2(e, "rebase"));
                }
                return Ok(RebaseOutcome::Conflicts(conflicts));
            }

            let conflicts = self.conflicting_paths()?;
            if !conflicts.is_empty() {
                return Ok(RebaseOutcome::Conflicts(conflicts));
            }
            self.commit_rebase_step(rebase)?;
        }

        let sig = self.signature()?;
        rebase
            .finish(Some(&sig))
            .map_err(|e| GitError::from_git2(e, "finish rebase"))?;
        Ok(RebaseOutcome::Completed)
    }

    fn commit_rebase_step(&self, rebase: &mut git2::Rebase<'_>) -> Result<(), GitError> {
        let sig = self.signature()?;
        match rebase.commit(None, &sig, None) {
            Ok(_) => Ok(()),
            // The step's changes are already upstream; skip it.
            Err(e) if e.code() == git2::ErrorCode::Applied => Ok(()),
            Err(e) => Err(GitError::from_git2(e, "rebase commit")),
        }
    }

    // =========================================================================
    // Conflict Sides
    // =========================================================================

    /// Resolve one conflicted path with the content of an index stage.
    ///
    /// Stage 2 is "ours", stage 3 is "theirs". If the chosen side deleted
    /// the file, the file is removed from the working tree and the index.
    ///
    /// # Errors
    ///
    /// - [`GitError::NotConflicted`] if `path` has no conflict entry
    pub fn checkout_conflict_side(&self, path: &str, stage: i32) -> Result<(), GitError> {
        let mut index = self.fresh_index()?;

        let mut chosen = None;
        let mut found = false;
        for conflict in index.conflicts()? {
            let conflict = conflict?;
            let matches = [&conflict.ancestor, &conflict.our, &conflict.their]
                .into_iter()
                .flatten()
                .any(|entry| entry.path == path.as_bytes());
            if matches {
                found = true;
                chosen = if stage == 2 { conflict.our } else { conflict.their };
                break;
            }
        }
        if !found {
            return Err(GitError::NotConflicted {
                path: path.to_string(),
            });
        }

        let rel = Path::new(path);
        let full = self.work_dir()?.join(rel);
        match chosen {
            Some(entry) => {
                let blob = self.repo.find_blob(entry.id)?;
                if let Some(parent) = full.parent() {
                    fs::create_dir_all(parent).map_err(|e| GitError::Io {
                        path: parent.to_path_buf(),
                        source: e,
                    })?;
                }
                fs::write(&full, blob.content()).map_err(|e| GitError::Io {
                    path: full.clone(),
                    source: e,
                })?;
                index
                    .add_path(rel)
                    .map_err(|e| GitError::from_git2(e, path))?;
            }
            None => {
                match fs::remove_file(&full) {
                    Ok(()) => {}
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                    Err(e) => return Err(GitError::Io { path: full, source: e }),
                }
                index
                    .remove_path(rel)
                    .map_err(|e| GitError::from_git2(e, path))?;
            }
        }

        index.write().map_err(|e| GitError::from_git2(e, "index"))
    }
}
