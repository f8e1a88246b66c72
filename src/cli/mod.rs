//! cli
//!
//! Command-line interface layer for repoflow.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Open the working copy through the [`crate::engine::Orchestrator`]
//! - Delegate to command handlers and print their results
//!
//! Handlers never touch the repository directly; every change goes through
//! the orchestrator's scheduler.

pub mod args;
pub mod commands;

pub use args::Cli;

use anyhow::Result;
use log::LevelFilter;
use std::path::PathBuf;

/// Flags shared by every handler.
#[derive(Debug, Clone)]
pub struct Context {
    pub cwd: PathBuf,
    pub config: Option<PathBuf>,
}

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`.
pub fn run() -> Result<()> {
    let cli = Cli::parse_args();

    let level = if cli.debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    let _ = env_logger::builder()
        .filter_level(level)
        .parse_default_env()
        .try_init();

    let cwd = match cli.cwd {
        Some(path) => path,
        None => std::env::current_dir()?,
    };
    let ctx = Context {
        cwd,
        config: cli.config,
    };

    commands::dispatch(cli.command, &ctx)
}
