//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! - `--cwd <path>`: Run as if in that directory
//! - `--debug`: Enable debug logging
//! - `--config <file>`: Read global configuration from this file

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// repoflow - drive a working copy the way the IDE does
#[derive(Parser, Debug)]
#[command(name = "repoflow")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Run as if repoflow was started in this directory
    #[arg(long, global = true)]
    pub cwd: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Global configuration file (overrides the standard locations)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show staged and unstaged changes
    Status {
        /// Print the snapshot as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the repository state and ahead/behind counts
    State,

    /// Show recent commits on HEAD
    Log {
        /// Number of commits to show
        #[arg(short = 'n', long, default_value_t = 10)]
        limit: usize,
    },

    /// Commit the index
    Commit {
        /// Commit message
        #[arg(short, long)]
        message: String,
    },

    /// Add paths to the index
    Stage {
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Reset paths in the index to HEAD
    Unstage {
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Switch branches
    #[command(
        after_help = "\
EXAMPLES:
    repoflow checkout main
    repoflow checkout -b feature/schema-v2"
    )]
    Checkout {
        /// Branch to switch to
        branch: String,

        /// Create the branch at HEAD first
        #[arg(short = 'b')]
        create: bool,
    },

    /// Fetch the upstream remote
    Fetch,

    /// Fetch and integrate the upstream branch
    #[command(
        long_about = "Fetch and integrate the upstream branch.\n\n\
            Before anything is written, the pull is checked against the working \
            copy: it is refused when incoming changes would overwrite local edits, \
            collide with untracked files, or when a rebase meets uncommitted \
            changes. Conflicts during integration leave the merge or rebase in \
            progress for `resolve`, `continue` and `abort`."
    )]
    Pull {
        #[command(flatten)]
        mode: PullMode,
    },

    /// Push the current branch to its upstream
    Push,

    /// Resolve conflicted paths with one side
    #[command(
        long_about = "Resolve conflicted paths with one side.\n\n\
            While merging, --mine is the local branch and --theirs the incoming \
            commit. While rebasing, --mine is the upstream branch being rebased \
            onto and --theirs the local commit being replayed.",
        after_help = "\
EXAMPLES:
    repoflow resolve --theirs schema/order.xsd
    repoflow resolve --mine                  # every conflicted path"
    )]
    Resolve {
        #[command(flatten)]
        side: ResolveSide,

        /// Paths to resolve (all conflicted paths if empty)
        paths: Vec<String>,
    },

    /// Continue the rebase in progress
    Continue,

    /// Abort the merge or rebase in progress
    Abort,

    /// Recreate the conflicts of the pending merge or rebase step
    Restart,

    /// Stash operations
    Stash {
        #[command(subcommand)]
        action: StashAction,
    },

    /// Update submodules recursively
    Submodules,
}

#[derive(Args, Debug, Default)]
#[group(multiple = false)]
pub struct PullMode {
    /// Rebase local commits onto the upstream
    #[arg(long)]
    pub rebase: bool,

    /// Merge the upstream (fast-forward when possible)
    #[arg(long)]
    pub merge: bool,
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
pub struct ResolveSide {
    /// Keep my side
    #[arg(long)]
    pub mine: bool,

    /// Keep their side
    #[arg(long)]
    pub theirs: bool,
}

#[derive(Subcommand, Debug)]
pub enum StashAction {
    /// Stash local changes
    Save {
        #[arg(short, long)]
        message: Option<String>,
    },
    /// Apply a stash and drop it
    Pop {
        #[arg(default_value_t = 0)]
        index: usize,
    },
    /// Apply a stash, keeping it
    Apply {
        #[arg(default_value_t = 0)]
        index: usize,
    },
    /// Drop a stash
    Drop {
        #[arg(default_value_t = 0)]
        index: usize,
    },
    /// List stashes
    List,
}
