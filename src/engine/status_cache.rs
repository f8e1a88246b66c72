//! engine::status_cache
//!
//! Memoized staged/unstaged status of the open working copy.
//!
//! # Invalidation
//!
//! The snapshot is dropped when
//! - an operation whose kind can touch files or refs succeeds,
//! - a file inside the working tree is saved,
//! - the host window regains focus,
//! - the working copy is opened, switched or closed.
//!
//! # Invariants
//!
//! A generation counter is bumped by every invalidation. A computation
//! that started under an older generation returns its result to its caller
//! but never stores it, so a stale snapshot can't outlive an invalidation.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use super::context::RepositoryContext;
use super::error::Result;
use super::events::{GitEventListener, OperationInfo};
use crate::core::types::GitStatus;

#[derive(Debug, Default)]
struct CacheState {
    snapshot: Option<Arc<GitStatus>>,
    generation: u64,
}

/// Lazily computed, shared status snapshot.
#[derive(Debug)]
pub struct StatusCache {
    context: Arc<RepositoryContext>,
    state: Mutex<CacheState>,
}

impl StatusCache {
    pub fn new(context: Arc<RepositoryContext>) -> Self {
        Self {
            context,
            state: Mutex::new(CacheState::default()),
        }
    }

    /// The current snapshot, computing it on a miss.
    pub fn get_status(&self) -> Result<Arc<GitStatus>> {
        let generation = {
            let state = self.lock();
            if let Some(snapshot) = &state.snapshot {
                return Ok(Arc::clone(snapshot));
            }
            state.generation
        };

        let status = Arc::new(self.context.read(|handle| {
            let include_untracked = handle.config().include_untracked();
            handle.with_git(|git| {
                git.refresh_index()?;
                Ok(git.status(include_untracked)?)
            })
        })?);

        let mut state = self.lock();
        if state.generation == generation {
            state.snapshot = Some(Arc::clone(&status));
        } else {
            log::debug!("status computed under a stale generation, not cached");
        }
        Ok(status)
    }

    /// The snapshot if one is cached, without computing.
    pub fn peek(&self) -> Option<Arc<GitStatus>> {
        self.lock().snapshot.clone()
    }

    /// Drop the snapshot.
    pub fn invalidate(&self, reason: &str) {
        let mut state = self.lock();
        state.generation += 1;
        if state.snapshot.take().is_some() {
            log::debug!("status invalidated: {}", reason);
        }
    }

    /// Invalidate if `path` lies inside the open working tree.
    pub fn on_file_saved(&self, path: &Path) {
        let Ok(handle) = self.context.current() else {
            return;
        };
        let work_dir = normalize(handle.work_dir());
        if normalize(path).starts_with(&work_dir) {
            self.invalidate("file saved");
        }
    }

    pub fn on_focus_gained(&self) {
        self.invalidate("focus regained");
    }

    /// Forget everything; used when the working copy changes.
    pub fn reset(&self) {
        self.invalidate("working copy changed");
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl GitEventListener for StatusCache {
    fn succeeded(&self, info: &OperationInfo) {
        if info.kind.invalidates_status() {
            self.invalidate(&info.kind.to_string());
        }
    }
}

/// Canonical form of a path; for a not-yet-existing file, its parent's.
fn normalize(path: &Path) -> PathBuf {
    if let Ok(canonical) = path.canonicalize() {
        return canonical;
    }
    match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) => parent
            .canonicalize()
            .map(|p| p.join(name))
            .unwrap_or_else(|_| path.to_path_buf()),
        _ => path.to_path_buf(),
    }
}
