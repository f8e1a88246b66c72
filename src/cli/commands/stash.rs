//! stash command

use super::{open, print_conflicts};
use crate::cli::args::StashAction;
use crate::cli::Context;
use anyhow::Result;

pub fn stash(ctx: &Context, action: StashAction) -> Result<()> {
    let orchestrator = open(ctx)?;

    match action {
        StashAction::Save { message } => match orchestrator.stash_save(message).wait()? {
            Some(oid) => println!("Saved stash {}", oid.short(8)),
            None => println!("No local changes to save"),
        },
        StashAction::Pop { index } => {
            let response = orchestrator.stash_pop(index).wait()?;
            if response.has_conflicts() {
                println!("stash@{{{}}} applied with conflicts; the stash was kept", index);
                print_conflicts(&response.conflicting_paths);
            } else {
                println!("Popped stash@{{{}}}", index);
            }
        }
        StashAction::Apply { index } => {
            let response = orchestrator.stash_apply(index).wait()?;
            println!("Applied stash@{{{}}}", index);
            print_conflicts(&response.conflicting_paths);
        }
        StashAction::Drop { index } => {
            orchestrator.stash_drop(index).wait()?;
            println!("Dropped stash@{{{}}}", index);
        }
        StashAction::List => {
            for entry in orchestrator.stash_list()? {
                println!("stash@{{{}}}: {}", entry.index, entry.message);
            }
        }
    }
    Ok(())
}
