//! engine::conflicts
//!
//! Conflict resolution and merge/rebase control.
//!
//! # Mine and theirs
//!
//! The user-facing request stays the same across merges and rebases, but
//! the content it selects does not:
//!
//! | State | mine | theirs |
//! |---|---|---|
//! | merging | local branch (stage 2) | incoming commit (stage 3) |
//! | rebasing | upstream being rebased onto (stage 2) | replayed commit (stage 3) |
//!
//! The mapping lives in [`ConflictResolution::side_for`]; this module only
//! applies it. Conflicts left by a revert, a cherry-pick or a stash apply
//! keep the merge roles: mine is HEAD, theirs the change being applied.

use super::error::{OrchestratorError, Result};
use crate::core::types::{ConflictResolution, OperationResponse, RepositoryState};
use crate::git::{Git, GitError, RebaseOutcome};

/// Resolve each path with the side `resolution` selects in the current state.
///
/// All paths are checked before any is touched.
pub(crate) fn resolve(
    git: &Git,
    resolution: ConflictResolution,
    paths: &[String],
) -> Result<OperationResponse> {
    let state = git.state()?;
    let conflicted = git.conflicting_paths()?;
    let side = resolution
        .side_for(roles_for(state, &conflicted))
        .ok_or(OrchestratorError::NoConflictInProgress)?;

    if let Some(path) = paths.iter().find(|p| !conflicted.contains(*p)) {
        return Err(OrchestratorError::NotConflicted { path: path.clone() });
    }

    for path in paths {
        git.checkout_conflict_side(path, side.index_stage())?;
    }
    log::info!(
        "resolved {} path(s) using {:?} content ({:?})",
        paths.len(),
        side,
        resolution
    );

    response_for(git, git.conflicting_paths()?)
}

/// Commit the resolved step and replay the rest of the rebase.
pub(crate) fn continue_rebase(git: &Git) -> Result<OperationResponse> {
    let state = git.state()?;
    if state != RepositoryState::RebasingMerge {
        return Err(OrchestratorError::NoConflictInProgress);
    }

    match git.continue_rebase() {
        Ok(RebaseOutcome::Completed) => {
            log::info!("rebase finished");
            Ok(OperationResponse::completed(git.state()?))
        }
        Ok(RebaseOutcome::Conflicts(paths)) => {
            log::info!("rebase stopped on {} conflict(s)", paths.len());
            Ok(OperationResponse::conflicts(git.state()?, paths))
        }
        Err(GitError::UnresolvedConflicts { paths }) => {
            Ok(OperationResponse::conflicts(state, paths))
        }
        Err(e) => Err(e.into()),
    }
}

/// Abort the rebase in progress; a no-op when there is none.
pub(crate) fn abort_rebase(git: &Git) -> Result<OperationResponse> {
    if !git.abort_rebase()? {
        log::debug!("abort rebase: nothing to abort");
    }
    Ok(OperationResponse::completed(git.state()?))
}

/// Abort the merge, revert or cherry-pick in progress.
///
/// Conflicts with no operation behind them (a stash apply) are reset to
/// HEAD path by path. With nothing in progress it is a no-op.
///
/// # Errors
///
/// - [`OrchestratorError::BlockingState`] for conflicts under an operation
///   that cannot be aborted here (bisect, mailbox apply)
pub(crate) fn abort_merge(git: &Git) -> Result<OperationResponse> {
    let state = git.state()?;
    if state.is_merge() {
        git.abort_merge()?;
    } else if git.abort_pick()? {
        log::info!("revert or cherry-pick aborted");
    } else {
        let conflicted = git.conflicting_paths()?;
        match state {
            _ if conflicted.is_empty() => {
                log::debug!("abort merge: nothing to abort ({})", state);
            }
            RepositoryState::Safe => {
                git.discard_conflicts(&conflicted)?;
                log::info!("discarded {} conflicted path(s)", conflicted.len());
            }
            _ => return Err(OrchestratorError::BlockingState { state }),
        }
    }
    response_for(git, git.conflicting_paths()?)
}

/// Throw away resolutions and recreate the conflicts of the pending
/// merge or rebase step.
pub(crate) fn restart(git: &Git) -> Result<OperationResponse> {
    let paths = match git.state()? {
        RepositoryState::Merging | RepositoryState::MergingResolved => git.restart_merge()?,
        RepositoryState::RebasingMerge => git.restart_rebase_step()?,
        _ => return Err(OrchestratorError::NoConflictInProgress),
    };
    log::info!("restarted with {} conflict(s)", paths.len());
    response_for(git, paths)
}

/// The state whose mine/theirs roles apply to the current conflicts.
fn roles_for(state: RepositoryState, conflicted: &[String]) -> RepositoryState {
    match state {
        RepositoryState::Safe | RepositoryState::Other if !conflicted.is_empty() => {
            RepositoryState::Merging
        }
        other => other,
    }
}

fn response_for(git: &Git, paths: Vec<String>) -> Result<OperationResponse> {
    let state = git.state()?;
    if paths.is_empty() {
        Ok(OperationResponse::completed(state))
    } else {
        Ok(OperationResponse::conflicts(state, paths))
    }
}
