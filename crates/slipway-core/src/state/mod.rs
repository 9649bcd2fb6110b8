use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Lifecycle state of a supervised task.
///
/// ```text
/// Registered → Blocked → Starting → Running → Ready → { Retrying → Starting | ShuttingDown } → Terminated
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskState {
    Registered,
    /// Waiting for required tasks to become ready.
    Blocked,
    Starting,
    Running,
    Ready,
    /// Waiting out the backoff delay before the next attempt.
    Retrying,
    /// Shutdown observed, waiting for the work function to return.
    ShuttingDown,
    Terminated,
}

impl TaskState {
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskState::Terminated)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskState::Registered => "registered",
            TaskState::Blocked => "blocked",
            TaskState::Starting => "starting",
            TaskState::Running => "running",
            TaskState::Ready => "ready",
            TaskState::Retrying => "retrying",
            TaskState::ShuttingDown => "shutting-down",
            TaskState::Terminated => "terminated",
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shared runtime record of one registered task.
pub(crate) struct TaskCell {
    pub(crate) name: Arc<str>,
    pub(crate) requires: Vec<String>,
    /// Child of the supervisor token; cancelled by `Supervisor::stop` or global shutdown.
    pub(crate) token: CancellationToken,
    state: watch::Sender<TaskState>,
    /// Latches once the task reached `Ready`; dependents wait on it.
    ready: watch::Sender<bool>,
    ready_in_attempt: AtomicBool,
}

impl TaskCell {
    pub(crate) fn new(name: &str, requires: Vec<String>, token: CancellationToken) -> Self {
        Self {
            name: Arc::from(name),
            requires,
            token,
            state: watch::Sender::new(TaskState::Registered),
            ready: watch::Sender::new(false),
            ready_in_attempt: AtomicBool::new(false),
        }
    }

    pub(crate) fn state(&self) -> TaskState {
        *self.state.borrow()
    }

    pub(crate) fn set_state(&self, state: TaskState) {
        self.state.send_replace(state);
    }

    /// Moves `Running → Ready`. Returns `false` if the task was in any other state.
    pub(crate) fn try_ready(&self) -> bool {
        self.state.send_if_modified(|s| {
            if *s == TaskState::Running {
                *s = TaskState::Ready;
                true
            } else {
                false
            }
        })
    }

    /// Publishes readiness to dependents. Called after the `Ready` event is emitted.
    pub(crate) fn latch_ready(&self) {
        self.ready_in_attempt.store(true, Ordering::SeqCst);
        self.ready.send_replace(true);
    }

    pub(crate) fn has_been_ready(&self) -> bool {
        *self.ready.borrow()
    }

    /// Returns whether the attempt that just ended reached `Ready`, clearing the flag.
    pub(crate) fn take_ready_in_attempt(&self) -> bool {
        self.ready_in_attempt.swap(false, Ordering::SeqCst)
    }

    pub(crate) async fn wait_ready(&self) {
        let mut rx = self.ready.subscribe();
        // Sender lives as long as `self`.
        let _ = rx.wait_for(|r| *r).await;
    }

    pub(crate) async fn wait_terminated(&self) {
        let mut rx = self.state.subscribe();
        let _ = rx.wait_for(|s| s.is_terminal()).await;
    }
}
