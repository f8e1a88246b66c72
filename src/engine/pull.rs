//! engine::pull
//!
//! Fetch, pre-flight, integrate, classify.
//!
//! # Algorithm
//!
//! ```text
//! fetch -> blocking state? -> up to date? -> pre-flight -> checkpoint
//!       -> merge | rebase -> classify -> submodules
//! ```
//!
//! The pre-flight compares the paths touched by the incoming commits
//! (merge base to upstream tip) with the local status and refuses before
//! the engine is asked to integrate anything. A refusal leaves the
//! repository exactly as it was.

use std::collections::BTreeSet;

use super::error::{OrchestratorError, Result};
use super::scheduler::TaskContext;
use crate::core::config::Config;
use crate::core::messages::MessageKey;
use crate::core::types::{ChangeType, GitStatus, PullResponse, PullStatus, PullType};
use crate::git::{Git, MergeOutcome, RebaseOutcome, TreeChange};

/// Fetch the remote of the current branch's upstream.
pub(crate) fn fetch(git: &Git, config: &Config, ctx: &TaskContext) -> Result<()> {
    let remote = match git.upstream(config.remote())? {
        Some(upstream) => upstream.remote,
        None => config.remote().to_string(),
    };
    fetch_remote(git, &remote, ctx)
}

/// Pull the upstream of the current branch.
pub(crate) fn pull(
    git: &Git,
    config: &Config,
    pull_type: PullType,
    ctx: &TaskContext,
) -> Result<PullResponse> {
    let upstream = git
        .upstream(config.remote())?
        .ok_or(OrchestratorError::NoUpstream)?;
    fetch_remote(git, &upstream.remote, ctx)?;

    let state = git.state()?;
    if state.is_blocking() {
        log::info!("pull refused: repository is {}", state);
        return Ok(PullResponse::refused(
            PullStatus::Rejected,
            MessageKey::ResolveConflictsFirst,
            git.conflicting_paths()?,
        ));
    }

    let tip = git
        .try_resolve_ref(&upstream.tracking_ref)?
        .ok_or(OrchestratorError::NoUpstream)?;
    let head = git.head_oid()?;
    if git.is_ancestor(&tip, &head)? {
        log::info!("pull: {} is up to date", upstream.tracking_ref);
        return Ok(PullResponse::up_to_date());
    }

    let incoming = match git.merge_base(&head, &tip)? {
        Some(base) => git.changed_paths(&base, &tip)?,
        None => git.changed_paths(&head, &tip)?,
    };
    let fast_forward = git.is_ancestor(&head, &tip)?;
    let status = git.status(true)?;
    if let Some(refusal) = preflight(&status, &incoming, pull_type, fast_forward) {
        log::info!(
            "pull refused by pre-flight: {:?} {:?}",
            refusal.message,
            refusal.conflicting_paths
        );
        return Ok(refusal);
    }

    ctx.monitor()
        .begin(&format!("integrate {}", upstream.tracking_ref), None);
    ctx.checkpoint()?;

    let response = match pull_type {
        PullType::MergeFf => match git.merge_ref(&upstream.tracking_ref)? {
            MergeOutcome::UpToDate => PullResponse::up_to_date(),
            MergeOutcome::FastForward | MergeOutcome::Merged(_) => PullResponse::ok(),
            MergeOutcome::Conflicts(paths) => PullResponse::conflicts(paths),
        },
        PullType::Rebase => match git.rebase_onto(&upstream.tracking_ref)? {
            RebaseOutcome::Completed => PullResponse::ok(),
            RebaseOutcome::Conflicts(paths) => PullResponse::conflicts(paths),
        },
    };
    log::info!("pull ({:?}): {:?}", pull_type, response.status);

    if response.status == PullStatus::Ok && config.update_submodules_on_pull() {
        update_submodules(git, ctx)?;
    }

    Ok(response)
}

/// Update submodules recursively, checking for cancellation between them.
pub(crate) fn update_submodules(git: &Git, ctx: &TaskContext) -> Result<usize> {
    let token = ctx.token().clone();
    let updated = git.update_submodules(&mut |name: &str| {
        ctx.monitor().begin(name, None);
        !token.is_cancelled()
    })?;
    log::info!("updated {} submodule(s)", updated);
    Ok(updated)
}

fn fetch_remote(git: &Git, remote: &str, ctx: &TaskContext) -> Result<()> {
    ctx.checkpoint()?;

    let monitor = ctx.monitor();
    let token = ctx.token();
    monitor.begin(&format!("fetch {}", remote), None);
    let result = git.fetch(remote, &mut |received: usize, total: usize| {
        monitor.worked(received, total);
        !token.is_cancelled()
    });
    monitor.end();

    result.map_err(|e| OrchestratorError::from_remote("fetch", e))?;
    ctx.checkpoint()
}

/// Decide whether integrating `incoming` would clobber local work.
///
/// Returns the refusal to report, or `None` when the pull may proceed.
/// The checks run in a fixed order and the first hit wins.
pub fn preflight(
    status: &GitStatus,
    incoming: &[TreeChange],
    pull_type: PullType,
    fast_forward: bool,
) -> Option<PullResponse> {
    let incoming_paths: BTreeSet<&str> = incoming.iter().map(|c| c.path.as_str()).collect();
    let added_paths: BTreeSet<&str> = incoming
        .iter()
        .filter(|c| c.added)
        .map(|c| c.path.as_str())
        .collect();

    let staged: BTreeSet<&str> = status.staged_files.iter().map(|f| f.path.as_str()).collect();
    let untracked: BTreeSet<&str> = status
        .unstaged_files
        .iter()
        .filter(|f| f.change_type == ChangeType::Untracked)
        .map(|f| f.path.as_str())
        .collect();
    let uncommitted: BTreeSet<&str> = status
        .unstaged_files
        .iter()
        .filter(|f| f.change_type != ChangeType::Untracked)
        .map(|f| f.path.as_str())
        .chain(staged.iter().copied())
        .collect();

    let refuse = |status, key, paths: BTreeSet<&str>| {
        Some(PullResponse::refused(
            status,
            key,
            paths.into_iter().map(String::from).collect(),
        ))
    };

    let overwritten: BTreeSet<&str> = uncommitted.intersection(&incoming_paths).copied().collect();
    if !overwritten.is_empty() {
        return refuse(
            PullStatus::Conflicts,
            MessageKey::PullWouldOverwriteUncommittedChanges,
            overwritten,
        );
    }

    if pull_type == PullType::Rebase && !uncommitted.is_empty() {
        return refuse(
            PullStatus::Rejected,
            MessageKey::PullRebaseFailedBecauseUncommitted,
            uncommitted,
        );
    }

    let shadowed: BTreeSet<&str> = untracked.intersection(&added_paths).copied().collect();
    if !shadowed.is_empty() {
        return refuse(
            PullStatus::Rejected,
            MessageKey::PullRebaseFailedBecauseConflictingPaths,
            shadowed,
        );
    }

    if pull_type == PullType::MergeFf && !fast_forward && !staged.is_empty() {
        return refuse(
            PullStatus::Rejected,
            MessageKey::PullMergeFailedBecauseStagedChanges,
            staged,
        );
    }

    None
}
