//! engine::scheduler
//!
//! The single serialized operation queue.
//!
//! # Architecture
//!
//! One dedicated worker thread drains an unbounded channel of jobs in
//! submission order. Each job is wrapped so that it
//!
//! 1. fires `about_to_start`,
//! 2. honors cancellation and the optional start delay,
//! 3. runs the task with a [`TaskContext`] (cancellation token + progress
//!    monitor),
//! 4. folds lock-flavored errors into lock contention,
//! 5. fires exactly one of `succeeded` / `failed`,
//! 6. hands the result to the caller's [`TaskHandle`].
//!
//! A delayed job holds the worker while it waits, so everything submitted
//! after it waits too and FIFO order is kept.
//!
//! # Invariants
//!
//! - At most one task runs at a time
//! - Tasks start in submission order
//! - Every task produces exactly one start and one finish event
//! - Dropping the scheduler drains the queue and joins the worker
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use repoflow::engine::events::{EventBus, OperationInfo, OperationKind};
//! use repoflow::engine::scheduler::OperationScheduler;
//!
//! let scheduler = OperationScheduler::new(Arc::new(EventBus::new()));
//! let info = OperationInfo::new(OperationKind::Fetch, "demo");
//! let handle = scheduler.schedule(info, |_ctx| Ok(42usize));
//! assert_eq!(handle.wait().unwrap(), 42);
//! ```

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError};

use super::error::{OrchestratorError, Result};
use super::events::{EventBus, OperationFailure, OperationId, OperationInfo, OperationOutcome};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Cooperative cancellation flag shared between a task and its handle.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<TokenState>);

#[derive(Debug)]
struct TokenState {
    cancelled: AtomicBool,
    // Dropped on cancel; the disconnect wakes anyone blocked on `woken`.
    trigger: Mutex<Option<Sender<()>>>,
    woken: Receiver<()>,
}

impl Default for TokenState {
    fn default() -> Self {
        let (trigger, woken) = crossbeam_channel::bounded(0);
        Self {
            cancelled: AtomicBool::new(false),
            trigger: Mutex::new(Some(trigger)),
            woken,
        }
    }
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.cancelled.store(true, Ordering::SeqCst);
        self.0
            .trigger
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.cancelled.load(Ordering::SeqCst)
    }

    /// Block for `timeout`, returning early with
    /// [`OrchestratorError::Cancelled`] once [`cancel`](Self::cancel) is called.
    pub fn sleep(&self, timeout: Duration) -> Result<()> {
        match self.0.woken.recv_timeout(timeout) {
            Err(RecvTimeoutError::Timeout) => self.checkpoint(),
            Ok(()) | Err(RecvTimeoutError::Disconnected) => Err(OrchestratorError::Cancelled),
        }
    }

    /// Fail with [`OrchestratorError::Cancelled`] if cancellation was requested.
    pub fn checkpoint(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(OrchestratorError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Receives progress from a running task.
pub trait ProgressMonitor: Send + Sync {
    /// A unit of work starts; `total` is the amount of work, if known.
    fn begin(&self, _task: &str, _total: Option<usize>) {}

    /// `done` units of `total` are complete.
    fn worked(&self, _done: usize, _total: usize) {}

    fn end(&self) {}
}

/// Monitor that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressMonitor for NoProgress {}

/// Per-submission options.
#[derive(Clone, Default)]
pub struct ScheduleOptions {
    /// Wait this long before starting (the queue waits too).
    pub delay: Option<Duration>,
    /// Progress sink; defaults to [`NoProgress`].
    pub monitor: Option<Arc<dyn ProgressMonitor>>,
}

impl ScheduleOptions {
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_monitor(mut self, monitor: Arc<dyn ProgressMonitor>) -> Self {
        self.monitor = Some(monitor);
        self
    }
}

/// What a running task can see of its own scheduling.
pub struct TaskContext {
    info: OperationInfo,
    token: CancellationToken,
    monitor: Arc<dyn ProgressMonitor>,
}

impl TaskContext {
    pub fn info(&self) -> &OperationInfo {
        &self.info
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn monitor(&self) -> &dyn ProgressMonitor {
        self.monitor.as_ref()
    }

    /// Shorthand for `self.token().checkpoint()`.
    pub fn checkpoint(&self) -> Result<()> {
        self.token.checkpoint()
    }
}

/// Caller-side handle to a scheduled task.
pub struct TaskHandle<T> {
    info: OperationInfo,
    token: CancellationToken,
    finished: Arc<AtomicBool>,
    result: Receiver<Result<T>>,
}

impl<T> TaskHandle<T> {
    pub fn id(&self) -> OperationId {
        self.info.id
    }

    pub fn info(&self) -> &OperationInfo {
        &self.info
    }

    /// Request cancellation. Takes effect at the task's next checkpoint.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// The token [`cancel`](Self::cancel) sets, for handing to a UI control.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Check if the task has finished (its result may not be taken yet).
    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }

    /// Block until the task finishes.
    pub fn wait(self) -> Result<T> {
        self.result.recv().unwrap_or_else(|_| Err(worker_gone()))
    }

    /// Block for at most `timeout`. Returns `None` if still running.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<Result<T>> {
        match self.result.recv_timeout(timeout) {
            Ok(result) => Some(result),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => Some(Err(worker_gone())),
        }
    }

    /// Take the result if the task has finished.
    pub fn try_result(&self) -> Option<Result<T>> {
        match self.result.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(worker_gone())),
        }
    }
}

impl<T> std::fmt::Debug for TaskHandle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskHandle")
            .field("info", &self.info)
            .field("cancelled", &self.is_cancelled())
            .field("finished", &self.is_finished())
            .finish()
    }
}

fn worker_gone() -> OrchestratorError {
    OrchestratorError::Internal("operation worker stopped before delivering a result".into())
}

/// Serializes operations onto one worker thread.
pub struct OperationScheduler {
    sender: Option<Sender<Job>>,
    worker: Option<JoinHandle<()>>,
    events: Arc<EventBus>,
    default_delay: Option<Duration>,
}

impl OperationScheduler {
    /// Start the worker thread.
    pub fn new(events: Arc<EventBus>) -> Self {
        let (sender, receiver) = crossbeam_channel::unbounded::<Job>();
        let worker = thread::Builder::new()
            .name("repoflow-worker".to_string())
            .spawn(move || {
                for job in receiver {
                    job();
                }
                log::debug!("operation worker stopped");
            });

        let worker = match worker {
            Ok(handle) => Some(handle),
            Err(e) => {
                log::error!("cannot spawn operation worker: {}", e);
                None
            }
        };

        Self {
            sender: worker.as_ref().map(|_| sender),
            worker,
            events,
            default_delay: None,
        }
    }

    /// Delay applied to submissions that don't set one.
    pub fn with_default_delay(mut self, delay: Option<Duration>) -> Self {
        self.default_delay = delay;
        self
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    /// Enqueue a task with default options.
    pub fn schedule<T, F>(&self, info: OperationInfo, task: F) -> TaskHandle<T>
    where
        T: OperationOutcome + Send + 'static,
        F: FnOnce(&TaskContext) -> Result<T> + Send + 'static,
    {
        self.schedule_with(info, ScheduleOptions::default(), task)
    }

    /// Enqueue a task.
    pub fn schedule_with<T, F>(
        &self,
        info: OperationInfo,
        options: ScheduleOptions,
        task: F,
    ) -> TaskHandle<T>
    where
        T: OperationOutcome + Send + 'static,
        F: FnOnce(&TaskContext) -> Result<T> + Send + 'static,
    {
        let token = CancellationToken::new();
        let finished = Arc::new(AtomicBool::new(false));
        let (result_tx, result_rx) = crossbeam_channel::bounded(1);

        let handle = TaskHandle {
            info: info.clone(),
            token: token.clone(),
            finished: Arc::clone(&finished),
            result: result_rx,
        };

        let ctx = TaskContext {
            info,
            token,
            monitor: options.monitor.unwrap_or_else(|| Arc::new(NoProgress)),
        };
        let delay = options.delay.or(self.default_delay);
        let events = Arc::clone(&self.events);

        let job: Job = Box::new(move || {
            let result = run_task(&events, &ctx, delay, task);
            finished.store(true, Ordering::SeqCst);
            // The caller may have dropped its handle.
            let _ = result_tx.send(result);
        });

        log::debug!("[{}] queued {}", handle.info.id, handle.info.description);
        match &self.sender {
            Some(sender) => {
                if sender.send(job).is_err() {
                    log::error!("operation queue closed, dropping {}", handle.info.id);
                }
            }
            None => log::error!("no operation worker, dropping {}", handle.info.id),
        }

        handle
    }
}

fn run_task<T, F>(
    events: &EventBus,
    ctx: &TaskContext,
    delay: Option<Duration>,
    task: F,
) -> Result<T>
where
    T: OperationOutcome,
    F: FnOnce(&TaskContext) -> Result<T>,
{
    let info = &ctx.info;
    events.about_to_start(info);

    let result = wait_for_start(ctx, delay).and_then(|()| {
        panic::catch_unwind(AssertUnwindSafe(|| task(ctx))).unwrap_or_else(|_| {
            Err(OrchestratorError::Internal(format!(
                "{} panicked",
                info.description
            )))
        })
    });
    let result = result.map_err(OrchestratorError::reclassify);

    match &result {
        Ok(value) => match value.rejection() {
            Some(message) => events.failed(info, &OperationFailure::Rejected { message }),
            None => events.succeeded(info),
        },
        Err(err) => events.failed(info, &OperationFailure::from_error(err)),
    }

    result
}

fn wait_for_start(ctx: &TaskContext, delay: Option<Duration>) -> Result<()> {
    ctx.checkpoint()?;
    match delay {
        Some(delay) => ctx.token.sleep(delay),
        None => Ok(()),
    }
}

impl Drop for OperationScheduler {
    fn drop(&mut self) {
        // Closing the channel lets the worker finish what is queued and exit.
        drop(self.sender.take());
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::error!("operation worker panicked");
            }
        }
    }
}
