//! core
//!
//! Domain types, message keys and configuration for repoflow.
//!
//! # Modules
//!
//! - [`types`] - Strong types: BranchName, Oid, status snapshots, responses
//! - [`messages`] - Localizable message keys carried by refusals
//! - [`config`] - Configuration schema and loading
//!
//! Nothing here touches a repository; see [`crate::git`] for that.

pub mod config;
pub mod messages;
pub mod types;
