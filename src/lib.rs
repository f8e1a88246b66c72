//! repoflow - repository operation orchestration for an IDE Git client
//!
//! repoflow sits between an editor's Git views and a local repository. It
//! serializes mutating operations on one background worker, broadcasts
//! their lifecycle to listeners, keeps a memoized status snapshot, and
//! implements the pull, push and conflict workflows on top of libgit2.
//!
//! # Architecture
//!
//! - [`cli`] - Command-line front end over the orchestrator
//! - [`engine`] - Scheduler, events, status cache and the workflows
//! - [`core`] - Domain types, message keys and configuration
//! - [`git`] - Single interface for all Git operations
//!
//! # Correctness Invariants
//!
//! 1. Mutating operations never overlap and run in submission order
//! 2. A pull or push that is refused leaves the repository untouched
//! 3. "Mine" and "theirs" always mean what the user sees, merge or rebase
//! 4. Lock contention is reported, never retried or cleared behind the user

pub mod cli;
pub mod core;
pub mod engine;
pub mod git;

pub use engine::{Orchestrator, OrchestratorError};
