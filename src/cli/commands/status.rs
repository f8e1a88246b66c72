//! status, state and log commands - Read-only views of the working copy

use super::open;
use crate::cli::Context;
use anyhow::Result;

/// Print the staged and unstaged file lists.
pub fn status(ctx: &Context, json: bool) -> Result<()> {
    let orchestrator = open(ctx)?;
    let snapshot = orchestrator.status()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&*snapshot)?);
        return Ok(());
    }

    if snapshot.is_clean() {
        println!("nothing to commit, working tree clean");
        return Ok(());
    }
    if !snapshot.staged_files.is_empty() {
        println!("Staged:");
        for file in &snapshot.staged_files {
            println!("  {:<10} {}", file.change_type.to_string(), file.path);
        }
    }
    if !snapshot.unstaged_files.is_empty() {
        println!("Unstaged:");
        for file in &snapshot.unstaged_files {
            println!("  {:<10} {}", file.change_type.to_string(), file.path);
        }
    }
    Ok(())
}

/// Print the repository state, current branch and upstream distance.
pub fn state(ctx: &Context) -> Result<()> {
    let orchestrator = open(ctx)?;

    println!("state: {}", orchestrator.repository_state()?);
    match orchestrator.current_branch()? {
        Some(branch) => println!("branch: {}", branch),
        None => println!("branch: (detached)"),
    }
    if let Some(counts) = orchestrator.ahead_behind()? {
        println!("ahead: {}  behind: {}", counts.ahead, counts.behind);
    }
    Ok(())
}

pub fn log(ctx: &Context, limit: usize) -> Result<()> {
    let orchestrator = open(ctx)?;
    for commit in orchestrator.history(limit)? {
        println!(
            "{}  {}  {} <{}>",
            commit.oid.short(8),
            commit.summary,
            commit.author_name,
            commit.author_email
        );
    }
    Ok(())
}
