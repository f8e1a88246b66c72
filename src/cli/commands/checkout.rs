//! checkout command - Switch branches

use super::open;
use crate::cli::Context;
use crate::core::types::BranchName;
use crate::engine::OrchestratorError;
use anyhow::{bail, Context as _, Result};

/// Switch to `branch`, creating it at HEAD when `create` is set.
///
/// A checkout that would overwrite local edits lists the offending paths.
pub fn checkout(ctx: &Context, branch: &str, create: bool) -> Result<()> {
    let name = BranchName::new(branch).context("Invalid branch name")?;
    let orchestrator = open(ctx)?;

    let handle = if create {
        orchestrator.checkout_new_branch(name.clone(), None)
    } else {
        orchestrator.checkout_branch(name.clone())
    };

    match handle.wait() {
        Ok(()) => {
            println!("Switched to branch '{}'", name);
            Ok(())
        }
        Err(OrchestratorError::CheckoutConflict { paths }) => {
            for path in &paths {
                eprintln!("  would overwrite: {}", path);
            }
            bail!("checkout of '{}' would overwrite local changes", name)
        }
        Err(e) => Err(e.into()),
    }
}
