//! resolve, continue, abort and restart commands - Work through conflicts
//!
//! `abort` dispatches on the repository state: a rebase is aborted as a
//! rebase; anything else goes through merge abort, which also undoes a
//! conflicted revert or cherry-pick and resets paths a stash apply left
//! conflicted. With nothing in progress it is a no-op.

use super::{open, print_conflicts};
use crate::cli::args::ResolveSide;
use crate::cli::Context;
use crate::core::types::{OperationResponse, RepositoryState};
use anyhow::{bail, Result};

/// Resolve `paths` (every conflicted path if empty) with one side.
pub fn resolve(ctx: &Context, side: &ResolveSide, paths: Vec<String>) -> Result<()> {
    let orchestrator = open(ctx)?;
    let paths = if paths.is_empty() {
        orchestrator.conflicting_paths()?
    } else {
        paths
    };
    if paths.is_empty() {
        bail!("no conflicted paths");
    }

    let handle = if side.mine {
        orchestrator.resolve_using_mine(paths)
    } else {
        orchestrator.resolve_using_theirs(paths)
    };
    report(&handle.wait()?);
    Ok(())
}

pub fn continue_op(ctx: &Context) -> Result<()> {
    let orchestrator = open(ctx)?;
    report(&orchestrator.continue_rebase().wait()?);
    Ok(())
}

pub fn abort(ctx: &Context) -> Result<()> {
    let orchestrator = open(ctx)?;
    let response = match orchestrator.repository_state()? {
        RepositoryState::RebasingMerge => orchestrator.abort_rebase().wait()?,
        _ => orchestrator.abort_merge().wait()?,
    };
    report(&response);
    Ok(())
}

pub fn restart(ctx: &Context) -> Result<()> {
    let orchestrator = open(ctx)?;
    report(&orchestrator.restart_merge().wait()?);
    Ok(())
}

fn report(response: &OperationResponse) {
    if response.has_conflicts() {
        println!("Conflicts remain ({}):", response.state);
        print_conflicts(&response.conflicting_paths);
    } else {
        println!("state: {}", response.state);
    }
}
