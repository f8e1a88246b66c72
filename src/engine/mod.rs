//! engine
//!
//! The repository operation orchestrator.
//!
//! # Architecture
//!
//! ```text
//! caller -> Orchestrator -> OperationScheduler (one worker, FIFO)
//!                              -> RepositoryContext -> Git doorway
//!                              -> conflicts / pull / push classify
//!                              -> EventBus -> StatusCache, UI listeners
//! ```
//!
//! Every mutating operation is scheduled and returns a [`TaskHandle`]
//! immediately. Read-only queries run on the caller's thread against the
//! same repository handle.
//!
//! # Invariants
//!
//! - At most one mutating operation runs at a time, in submission order
//! - Operations that write the index fail fast with lock contention while
//!   `<git-dir>/index.lock` exists
//! - Each operation fires one start event and one finish event
//! - The status snapshot never outlives a change it could have missed
//!
//! # Example
//!
//! ```no_run
//! use repoflow::engine::Orchestrator;
//! use repoflow::core::types::PullStatus;
//!
//! let orchestrator = Orchestrator::new();
//! orchestrator.open_working_copy("/path/to/repo").wait()?;
//!
//! let response = orchestrator.pull(None).wait()?;
//! if response.status == PullStatus::Conflicts {
//!     orchestrator.resolve_using_theirs(response.conflicting_paths).wait()?;
//! }
//! # Ok::<(), repoflow::engine::OrchestratorError>(())
//! ```

mod conflicts;
pub mod context;
pub mod error;
pub mod events;
mod pull;
mod push;
pub mod scheduler;
pub mod status_cache;

pub use context::{ConfigSource, RepositoryContext, RepositoryHandle};
pub use error::{OrchestratorError, Result};
pub use events::{
    EventBus, GitEventListener, OperationFailure, OperationId, OperationInfo, OperationKind,
    OperationOutcome,
};
pub use pull::preflight;
pub use scheduler::{
    CancellationToken, NoProgress, OperationScheduler, ProgressMonitor, ScheduleOptions,
    TaskContext, TaskHandle,
};
pub use status_cache::StatusCache;

use std::path::Path;
use std::sync::Arc;

use crate::core::config::Config;
use crate::core::types::{
    AheadBehind, BranchName, ConflictResolution, GitStatus, OperationResponse, Oid, PullResponse,
    PullType, PushResponse, RepositoryState, ResetMode, StashEntry,
};
use crate::git::{CommitInfo, Git, GitError, MergeOutcome, RepoInfo};

/// Facade over one repository context, its scheduler, events and cache.
pub struct Orchestrator {
    scheduler: OperationScheduler,
    context: Arc<RepositoryContext>,
    status: Arc<StatusCache>,
    events: Arc<EventBus>,
    config_source: ConfigSource,
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new()
    }
}

impl Orchestrator {
    /// Create an orchestrator reading configuration from the standard places.
    pub fn new() -> Self {
        Self::with_config_source(ConfigSource::Discover)
    }

    /// Create an orchestrator with an explicit global configuration source.
    pub fn with_config_source(config_source: ConfigSource) -> Self {
        let events = Arc::new(EventBus::new());
        let context = Arc::new(RepositoryContext::new());
        let status = Arc::new(StatusCache::new(Arc::clone(&context)));
        events.add_listener(status.clone());

        let default_delay = match config_source.load_global() {
            Ok(config) => config.default_delay(),
            Err(e) => {
                log::warn!("ignoring global configuration: {}", e);
                None
            }
        };

        let scheduler =
            OperationScheduler::new(Arc::clone(&events)).with_default_delay(default_delay);

        Self {
            scheduler,
            context,
            status,
            events,
            config_source,
        }
    }

    /// The event bus, for registering listeners.
    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    pub fn add_listener(&self, listener: Arc<dyn GitEventListener>) {
        self.events.add_listener(listener);
    }

    // =========================================================================
    // Working Copy
    // =========================================================================

    /// Open the repository containing `path`, replacing any open one.
    pub fn open_working_copy(&self, path: impl AsRef<Path>) -> TaskHandle<RepoInfo> {
        self.install(OperationKind::OpenWorkingCopy, path.as_ref())
    }

    /// Replace the open repository with the one containing `path`.
    pub fn switch_working_copy(&self, path: impl AsRef<Path>) -> TaskHandle<RepoInfo> {
        self.install(OperationKind::SwitchWorkingCopy, path.as_ref())
    }

    /// Release the open repository. Resolves to false if none was open.
    pub fn close_working_copy(&self) -> TaskHandle<bool> {
        let context = Arc::clone(&self.context);
        let status = Arc::clone(&self.status);
        let info = OperationInfo::new(OperationKind::CloseWorkingCopy, "close working copy");

        self.scheduler.schedule(info, move |_| {
            let previous = context.replace(None);
            status.reset();
            if let Some(handle) = &previous {
                log::info!("closed working copy {}", handle.work_dir().display());
            }
            Ok(previous.is_some())
        })
    }

    /// Paths of the open repository, if any.
    pub fn current_working_copy(&self) -> Option<RepoInfo> {
        self.context.current().ok().map(|h| h.info().clone())
    }

    fn install(&self, kind: OperationKind, path: &Path) -> TaskHandle<RepoInfo> {
        let path = path.to_path_buf();
        let context = Arc::clone(&self.context);
        let status = Arc::clone(&self.status);
        let source = self.config_source.clone();
        let info = OperationInfo::new(kind, format!("{} {}", kind, path.display()));

        self.scheduler.schedule(info, move |_| {
            let handle = Arc::new(RepositoryHandle::open(&path, &source)?);
            let repo_info = handle.info().clone();
            if let Some(previous) = context.replace(Some(handle)) {
                log::info!("released working copy {}", previous.work_dir().display());
            }
            status.reset();
            Ok(repo_info)
        })
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// The memoized status snapshot.
    pub fn status(&self) -> Result<Arc<GitStatus>> {
        self.status.get_status()
    }

    pub fn repository_state(&self) -> Result<RepositoryState> {
        self.query(|git, _| Ok(git.state()?))
    }

    pub fn conflicting_paths(&self) -> Result<Vec<String>> {
        self.query(|git, _| Ok(git.conflicting_paths()?))
    }

    /// Commit counts against the upstream, `None` without one.
    pub fn ahead_behind(&self) -> Result<Option<AheadBehind>> {
        self.query(|git, config| Ok(git.ahead_behind(config.remote())?))
    }

    /// Commits reachable from HEAD, newest first.
    pub fn history(&self, limit: usize) -> Result<Vec<CommitInfo>> {
        self.query(|git, _| Ok(git.history(limit)?))
    }

    pub fn branches(&self) -> Result<Vec<BranchName>> {
        self.query(|git, _| Ok(git.list_branches()?))
    }

    pub fn current_branch(&self) -> Result<Option<BranchName>> {
        self.query(|git, _| Ok(git.current_branch()?))
    }

    pub fn tags(&self) -> Result<Vec<String>> {
        self.query(|git, _| Ok(git.list_tags()?))
    }

    pub fn stash_list(&self) -> Result<Vec<StashEntry>> {
        self.query(|git, _| Ok(git.stash_list()?))
    }

    pub fn head(&self) -> Result<Oid> {
        self.query(|git, _| Ok(git.head_oid()?))
    }

    // =========================================================================
    // Status Triggers
    // =========================================================================

    /// The host saved `path`; invalidates status if it is in the work tree.
    pub fn on_file_saved(&self, path: impl AsRef<Path>) {
        self.status.on_file_saved(path.as_ref());
    }

    /// The host window regained focus.
    pub fn on_focus_gained(&self) {
        self.status.on_focus_gained();
    }

    // =========================================================================
    // Commit and Index
    // =========================================================================

    /// Commit the index. Refused while a rebase is in progress.
    pub fn commit(&self, message: impl Into<String>) -> TaskHandle<Oid> {
        let message = message.into();
        let summary = message.lines().next().unwrap_or("").to_string();
        self.submit(OperationKind::Commit, format!("commit \"{}\"", summary), move |git, _, _| {
            let state = git.state()?;
            if state == RepositoryState::RebasingMerge {
                return Err(OrchestratorError::BlockingState { state });
            }
            Ok(git.commit(&message)?)
        })
    }

    pub fn stage(&self, paths: Vec<String>) -> TaskHandle<()> {
        let description = format!("stage {} path(s)", paths.len());
        self.submit(OperationKind::Stage, description, move |git, _, _| {
            Ok(git.stage(&paths)?)
        })
    }

    pub fn unstage(&self, paths: Vec<String>) -> TaskHandle<()> {
        let description = format!("unstage {} path(s)", paths.len());
        self.submit(OperationKind::Unstage, description, move |git, _, _| {
            Ok(git.unstage(&paths)?)
        })
    }

    // =========================================================================
    // Checkout and Branches
    // =========================================================================

    pub fn checkout_branch(&self, name: BranchName) -> TaskHandle<()> {
        self.submit(OperationKind::Checkout, format!("checkout {}", name), move |git, _, _| {
            git.checkout_branch(&name).map_err(checkout_error)
        })
    }

    /// Create a branch at `start` (HEAD if `None`) and switch to it.
    /// Refused in a blocking state.
    pub fn checkout_new_branch(&self, name: BranchName, start: Option<Oid>) -> TaskHandle<()> {
        self.submit(OperationKind::Checkout, format!("checkout -b {}", name), move |git, _, _| {
            let state = git.state()?;
            if state.is_blocking() {
                return Err(OrchestratorError::BlockingState { state });
            }
            git.checkout_new_branch(&name, start.as_ref())
                .map_err(checkout_error)
        })
    }

    /// Detach HEAD at a commit.
    pub fn checkout_commit(&self, oid: Oid) -> TaskHandle<()> {
        self.submit(
            OperationKind::Checkout,
            format!("checkout {}", oid.short(8)),
            move |git, _, _| git.checkout_commit(&oid).map_err(checkout_error),
        )
    }

    /// Discard local edits on paths.
    pub fn restore_paths(&self, paths: Vec<String>) -> TaskHandle<()> {
        let description = format!("restore {} path(s)", paths.len());
        self.submit(OperationKind::RestorePaths, description, move |git, _, _| {
            Ok(git.restore_paths(&paths)?)
        })
    }

    pub fn create_branch(&self, name: BranchName, start: Option<Oid>) -> TaskHandle<()> {
        self.submit(OperationKind::CreateBranch, format!("branch {}", name), move |git, _, _| {
            Ok(git.create_branch(&name, start.as_ref())?)
        })
    }

    pub fn delete_branch(&self, name: BranchName) -> TaskHandle<()> {
        self.submit(OperationKind::DeleteBranch, format!("branch -d {}", name), move |git, _, _| {
            Ok(git.delete_branch(&name)?)
        })
    }

    /// Merge a local branch into HEAD.
    pub fn merge_branch(&self, name: BranchName) -> TaskHandle<OperationResponse> {
        self.submit(OperationKind::Merge, format!("merge {}", name), move |git, _, _| {
            let state = git.state()?;
            if state != RepositoryState::Safe {
                return Err(OrchestratorError::BlockingState { state });
            }
            match git.merge_ref(&name.local_ref())? {
                MergeOutcome::Conflicts(paths) => {
                    Ok(OperationResponse::conflicts(git.state()?, paths))
                }
                _ => Ok(OperationResponse::completed(git.state()?)),
            }
        })
    }

    // =========================================================================
    // Stash, Reset, Revert, Tags
    // =========================================================================

    /// Stash local changes. Resolves to `None` when there was nothing to stash.
    pub fn stash_save(&self, message: Option<String>) -> TaskHandle<Option<Oid>> {
        self.submit(OperationKind::StashSave, "stash save", move |git, config, _| {
            Ok(git.stash_save(message.as_deref(), config.include_untracked())?)
        })
    }

    pub fn stash_apply(&self, index: usize) -> TaskHandle<OperationResponse> {
        let description = format!("stash apply stash@{{{}}}", index);
        self.submit(OperationKind::StashApply, description, move |git, _, _| {
            let paths = git.stash_apply(index)?;
            stash_response(git, paths)
        })
    }

    pub fn stash_pop(&self, index: usize) -> TaskHandle<OperationResponse> {
        let description = format!("stash pop stash@{{{}}}", index);
        self.submit(OperationKind::StashPop, description, move |git, _, _| {
            let paths = git.stash_pop(index)?;
            stash_response(git, paths)
        })
    }

    pub fn stash_drop(&self, index: usize) -> TaskHandle<()> {
        let description = format!("stash drop stash@{{{}}}", index);
        self.submit(OperationKind::StashDrop, description, move |git, _, _| {
            Ok(git.stash_drop(index)?)
        })
    }

    pub fn reset(&self, oid: Oid, mode: ResetMode) -> TaskHandle<()> {
        let description = format!("reset --{:?} {}", mode, oid.short(8)).to_lowercase();
        self.submit(OperationKind::Reset, description, move |git, _, _| {
            Ok(git.reset(&oid, mode)?)
        })
    }

    /// Revert a commit; conflicts leave the revert in progress.
    pub fn revert(&self, oid: Oid) -> TaskHandle<OperationResponse> {
        let description = format!("revert {}", oid.short(8));
        self.submit(OperationKind::Revert, description, move |git, _, _| {
            let paths = git.revert(&oid)?;
            let state = git.state()?;
            Ok(if paths.is_empty() {
                OperationResponse::completed(state)
            } else {
                OperationResponse::conflicts(state, paths)
            })
        })
    }

    /// Tag `target` (HEAD if `None`); annotated when `message` is given.
    pub fn create_tag(
        &self,
        name: impl Into<String>,
        target: Option<Oid>,
        message: Option<String>,
    ) -> TaskHandle<()> {
        let name = name.into();
        self.submit(OperationKind::CreateTag, format!("tag {}", name), move |git, _, _| {
            Ok(git.create_tag(&name, target.as_ref(), message.as_deref())?)
        })
    }

    pub fn delete_tag(&self, name: impl Into<String>) -> TaskHandle<()> {
        let name = name.into();
        self.submit(OperationKind::DeleteTag, format!("tag -d {}", name), move |git, _, _| {
            Ok(git.delete_tag(&name)?)
        })
    }

    pub fn push_tag(&self, name: impl Into<String>) -> TaskHandle<PushResponse> {
        let name = name.into();
        self.submit(OperationKind::PushTag, format!("push tag {}", name), move |git, config, _| {
            push::push_tag(git, config, &name)
        })
    }

    // =========================================================================
    // Remote
    // =========================================================================

    pub fn fetch(&self) -> TaskHandle<()> {
        self.fetch_with(ScheduleOptions::default())
    }

    pub fn fetch_with(&self, options: ScheduleOptions) -> TaskHandle<()> {
        self.submit_with(OperationKind::Fetch, "fetch", options, |git, config, ctx| {
            pull::fetch(git, config, ctx)
        })
    }

    /// Pull using `pull_type`, or the configured type if `None`.
    pub fn pull(&self, pull_type: Option<PullType>) -> TaskHandle<PullResponse> {
        self.pull_with(pull_type, ScheduleOptions::default())
    }

    pub fn pull_with(
        &self,
        pull_type: Option<PullType>,
        options: ScheduleOptions,
    ) -> TaskHandle<PullResponse> {
        let description = match pull_type {
            Some(PullType::Rebase) => "pull (rebase)",
            Some(PullType::MergeFf) => "pull (merge)",
            None => "pull",
        };
        self.submit_with(OperationKind::Pull, description, options, move |git, config, ctx| {
            let pull_type = pull_type.unwrap_or_else(|| config.pull_type());
            pull::pull(git, config, pull_type, ctx)
        })
    }

    pub fn push(&self) -> TaskHandle<PushResponse> {
        self.push_with(ScheduleOptions::default())
    }

    pub fn push_with(&self, options: ScheduleOptions) -> TaskHandle<PushResponse> {
        self.submit_with(OperationKind::Push, "push", options, |git, config, _| {
            push::push(git, config)
        })
    }

    /// Update submodules recursively.
    pub fn update_submodules(&self) -> TaskHandle<usize> {
        self.submit(OperationKind::SubmoduleUpdate, "submodule update", |git, _, ctx| {
            pull::update_submodules(git, ctx)
        })
    }

    // =========================================================================
    // Conflicts
    // =========================================================================

    pub fn resolve(
        &self,
        resolution: ConflictResolution,
        paths: Vec<String>,
    ) -> TaskHandle<OperationResponse> {
        let description = format!("resolve {} path(s) ({:?})", paths.len(), resolution);
        self.submit(OperationKind::ResolveConflicts, description, move |git, _, _| {
            conflicts::resolve(git, resolution, &paths)
        })
    }

    /// Resolve with "my" side: the local branch when merging, the upstream
    /// when rebasing.
    pub fn resolve_using_mine(&self, paths: Vec<String>) -> TaskHandle<OperationResponse> {
        self.resolve(ConflictResolution::ResolveUsingMine, paths)
    }

    /// Resolve with "their" side: the incoming commit when merging, the
    /// replayed commit when rebasing.
    pub fn resolve_using_theirs(&self, paths: Vec<String>) -> TaskHandle<OperationResponse> {
        self.resolve(ConflictResolution::ResolveUsingTheirs, paths)
    }

    pub fn continue_rebase(&self) -> TaskHandle<OperationResponse> {
        self.submit(OperationKind::ContinueRebase, "rebase --continue", |git, _, _| {
            conflicts::continue_rebase(git)
        })
    }

    pub fn abort_rebase(&self) -> TaskHandle<OperationResponse> {
        self.submit(OperationKind::AbortRebase, "rebase --abort", |git, _, _| {
            conflicts::abort_rebase(git)
        })
    }

    pub fn abort_merge(&self) -> TaskHandle<OperationResponse> {
        self.submit(OperationKind::AbortMerge, "merge --abort", |git, _, _| {
            conflicts::abort_merge(git)
        })
    }

    /// Recreate the conflicts of the pending merge or rebase step.
    pub fn restart_merge(&self) -> TaskHandle<OperationResponse> {
        self.submit(OperationKind::RestartMerge, "restart merge", |git, _, _| {
            conflicts::restart(git)
        })
    }

    // =========================================================================
    // Plumbing
    // =========================================================================

    fn submit<T, F>(
        &self,
        kind: OperationKind,
        description: impl Into<String>,
        op: F,
    ) -> TaskHandle<T>
    where
        T: OperationOutcome + Send + 'static,
        F: FnOnce(&mut Git, &Config, &TaskContext) -> Result<T> + Send + 'static,
    {
        self.submit_with(kind, description, ScheduleOptions::default(), op)
    }

    fn submit_with<T, F>(
        &self,
        kind: OperationKind,
        description: impl Into<String>,
        options: ScheduleOptions,
        op: F,
    ) -> TaskHandle<T>
    where
        T: OperationOutcome + Send + 'static,
        F: FnOnce(&mut Git, &Config, &TaskContext) -> Result<T> + Send + 'static,
    {
        let context = Arc::clone(&self.context);
        let info = OperationInfo::new(kind, description);

        self.scheduler.schedule_with(info, options, move |ctx| {
            context.read(|handle| {
                handle
                    .with_git(|git| {
                        git.refresh_index()?;
                        if kind.requires_unlocked_index() {
                            git.ensure_unlocked()?;
                        }
                        op(git, handle.config(), ctx)
                    })
                    .map_err(|e| e.rooted_at(handle.git_dir()))
            })
        })
    }

    fn query<R>(&self, f: impl FnOnce(&mut Git, &Config) -> Result<R>) -> Result<R> {
        self.context
            .read(|handle| {
                handle.with_git(|git| {
                    git.refresh_index()?;
                    f(git, handle.config())
                })
            })
    }
}

fn checkout_error(err: GitError) -> OrchestratorError {
    match err {
        GitError::Conflict { paths, .. } => OrchestratorError::CheckoutConflict { paths },
        other => other.into(),
    }
}

fn stash_response(git: &Git, paths: Vec<String>) -> Result<OperationResponse> {
    let state = git.state()?;
    Ok(if paths.is_empty() {
        OperationResponse::completed(state)
    } else {
        OperationResponse::conflicts(state, paths)
    })
}
