//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! Each command handler:
//! 1. Opens the working copy through a fresh orchestrator
//! 2. Submits its operation and waits for the result
//! 3. Formats and displays output
//!
//! Refusals (a rejected pull, a rejected push) are errors so the exit
//! status reflects them; stopping on conflicts is not.

mod checkout;
mod commit;
mod recovery;
mod remote;
mod stash;
mod status;

pub use checkout::checkout;
pub use commit::{commit, stage, unstage};
pub use recovery::{abort, continue_op, resolve, restart};
pub use remote::{fetch, pull, push, submodules};
pub use stash::stash;
pub use status::{log, state, status};

use super::args::Command;
use super::Context;
use crate::engine::{ConfigSource, Orchestrator};
use anyhow::{Context as _, Result};

/// Dispatch a command to its handler.
pub fn dispatch(command: Command, ctx: &Context) -> Result<()> {
    match command {
        Command::Status { json } => status(ctx, json),
        Command::State => state(ctx),
        Command::Log { limit } => log(ctx, limit),
        Command::Commit { message } => commit(ctx, &message),
        Command::Stage { paths } => stage(ctx, paths),
        Command::Unstage { paths } => unstage(ctx, paths),
        Command::Checkout { branch, create } => checkout(ctx, &branch, create),
        Command::Fetch => fetch(ctx),
        Command::Pull { mode } => pull(ctx, &mode),
        Command::Push => push(ctx),
        Command::Resolve { side, paths } => resolve(ctx, &side, paths),
        Command::Continue => continue_op(ctx),
        Command::Abort => abort(ctx),
        Command::Restart => restart(ctx),
        Command::Stash { action } => stash(ctx, action),
        Command::Submodules => submodules(ctx),
    }
}

/// Build an orchestrator and open the working copy at `ctx.cwd`.
pub(crate) fn open(ctx: &Context) -> Result<Orchestrator> {
    let source = match &ctx.config {
        Some(path) => ConfigSource::File(path.clone()),
        None => ConfigSource::Discover,
    };
    let orchestrator = Orchestrator::with_config_source(source);
    orchestrator
        .open_working_copy(&ctx.cwd)
        .wait()
        .with_context(|| format!("Failed to open repository at {}", ctx.cwd.display()))?;
    Ok(orchestrator)
}

pub(crate) fn print_conflicts(paths: &[String]) {
    for path in paths {
        println!("  conflict: {}", path);
    }
}
