//! fetch, pull, push and submodules commands - Talk to the upstream

use super::{open, print_conflicts};
use crate::cli::args::PullMode;
use crate::cli::Context;
use crate::core::messages::MessageKey;
use crate::core::types::{PullResponse, PullStatus, PullType, PushStatus};
use anyhow::{bail, Result};

pub fn fetch(ctx: &Context) -> Result<()> {
    let orchestrator = open(ctx)?;
    orchestrator.fetch().wait()?;
    Ok(())
}

/// Pull, printing conflicts when the integration stops on them.
pub fn pull(ctx: &Context, mode: &PullMode) -> Result<()> {
    let pull_type = if mode.rebase {
        Some(PullType::Rebase)
    } else if mode.merge {
        Some(PullType::MergeFf)
    } else {
        None
    };

    let orchestrator = open(ctx)?;
    let response = orchestrator.pull(pull_type).wait()?;

    match response.status {
        PullStatus::Ok => println!("Pulled."),
        PullStatus::UpToDate => println!("Already up to date."),
        PullStatus::Conflicts
            if !response.message.as_ref().is_some_and(MessageKey::is_rejection) =>
        {
            println!("Pull stopped on conflicts:");
            print_conflicts(&response.conflicting_paths);
            println!("Resolve them, then run 'repoflow continue' or 'repoflow abort'.");
        }
        // Pre-flight stops leave the repository untouched.
        PullStatus::Conflicts | PullStatus::Rejected => return refused(&response),
    }
    Ok(())
}

fn refused(response: &PullResponse) -> Result<()> {
    for path in &response.conflicting_paths {
        eprintln!("  {}", path);
    }
    match response.message {
        Some(key) => bail!("pull refused: {}", key),
        None => bail!("pull refused"),
    }
}

pub fn push(ctx: &Context) -> Result<()> {
    let orchestrator = open(ctx)?;
    let response = orchestrator.push().wait()?;

    match response.status {
        PushStatus::Ok => println!("Pushed."),
        PushStatus::UpToDate => println!("Everything up to date."),
        PushStatus::RejectedNonFastForward => {
            bail!("push rejected (non-fast-forward): pull first")
        }
        PushStatus::RejectedOtherReason => bail!(
            "push rejected: {}",
            response.message.as_deref().unwrap_or("remote refused the update")
        ),
    }
    Ok(())
}

pub fn submodules(ctx: &Context) -> Result<()> {
    let orchestrator = open(ctx)?;
    let count = orchestrator.update_submodules().wait()?;
    println!("Updated {} submodule(s).", count);
    Ok(())
}
