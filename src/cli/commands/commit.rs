//! commit, stage and unstage commands

use super::open;
use crate::cli::Context;
use anyhow::Result;

pub fn commit(ctx: &Context, message: &str) -> Result<()> {
    let orchestrator = open(ctx)?;
    let oid = orchestrator.commit(message).wait()?;
    println!("[{}] {}", oid.short(8), message.lines().next().unwrap_or(""));
    Ok(())
}

pub fn stage(ctx: &Context, paths: Vec<String>) -> Result<()> {
    let orchestrator = open(ctx)?;
    orchestrator.stage(paths).wait()?;
    Ok(())
}

pub fn unstage(ctx: &Context, paths: Vec<String>) -> Result<()> {
    let orchestrator = open(ctx)?;
    orchestrator.unstage(paths).wait()?;
    Ok(())
}
