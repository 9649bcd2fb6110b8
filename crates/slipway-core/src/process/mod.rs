use std::{
    any::Any,
    future::Future,
    sync::{Arc, Mutex},
};

use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tracing::debug;

use crate::{Supervisor, TaskError, state::TaskCell};

/// Task-scoped handle passed to every work function.
///
/// Carries the cancellation context of the current attempt, the readiness signal, and
/// the set of sub-units spawned with [`Process::go`]. Cloning is cheap; clones refer to
/// the same attempt.
#[derive(Clone)]
pub struct Process {
    sup: Supervisor,
    cell: Arc<TaskCell>,
    token: CancellationToken,
    children: Arc<Children>,
}

pub(crate) struct Children {
    tracker: TaskTracker,
    first_error: Mutex<Option<TaskError>>,
}

impl Children {
    fn new() -> Self {
        Self {
            tracker: TaskTracker::new(),
            first_error: Mutex::new(None),
        }
    }

    fn record(&self, err: TaskError) {
        let mut slot = self
            .first_error
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if slot.is_none() {
            *slot = Some(err);
        }
    }

    /// Waits for every sub-unit and returns the first error any of them produced.
    pub(crate) async fn drain(&self) -> Option<TaskError> {
        self.tracker.close();
        self.tracker.wait().await;
        self.first_error
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take()
    }
}

impl Process {
    pub(crate) fn new(sup: Supervisor, cell: Arc<TaskCell>, token: CancellationToken) -> Self {
        Self {
            sup,
            cell,
            token,
            children: Arc::new(Children::new()),
        }
    }

    pub(crate) fn children(&self) -> Arc<Children> {
        Arc::clone(&self.children)
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.cell.name
    }

    #[inline]
    pub fn supervisor(&self) -> &Supervisor {
        &self.sup
    }

    /// Cancellation context of this attempt.
    ///
    /// Cancelled on supervisor shutdown, on [`Supervisor::stop`] for this task, and when
    /// the work function returns (so sub-units wind down with their parent).
    #[inline]
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Reports that setup is complete and dependents may start.
    ///
    /// No-op for tasks that are already ready or shutting down.
    pub fn ready(&self) {
        self.sup.mark_ready(&self.cell);
    }

    #[inline]
    pub fn is_shutting_down(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once this attempt has been asked to stop.
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }

    /// Spawns a sub-unit sharing this attempt's lifetime.
    ///
    /// The parent task terminates only after every sub-unit returned. The first
    /// non-cancellation error (or panic) of a sub-unit becomes the parent's result when the
    /// parent itself succeeded.
    pub fn go<F, Fut>(&self, work: F)
    where
        F: FnOnce(Process) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), TaskError>> + Send + 'static,
    {
        let child = self.clone();
        let children = Arc::clone(&self.children);
        let name = Arc::clone(&self.cell.name);

        self.children.tracker.spawn(async move {
            let outcome = match tokio::spawn(work(child)).await {
                Ok(res) => res,
                Err(e) if e.is_panic() => Err(TaskError::Panicked {
                    reason: panic_reason(e.into_panic()),
                }),
                Err(e) => Err(TaskError::fail(e.to_string())),
            };
            if let Err(err) = outcome
                && !err.is_canceled()
            {
                debug!(task = %name, error = %err, "sub-unit failed");
                children.record(err);
            }
        });
    }

    /// Runs `work` until it finishes or shutdown is requested, then always runs `cleanup`.
    ///
    /// On shutdown `work` is dropped before `cleanup` starts. The error of `work` wins over
    /// the error of `cleanup`.
    pub async fn do_clean<W, C>(&self, work: W, cleanup: C) -> Result<(), TaskError>
    where
        W: Future<Output = Result<(), TaskError>>,
        C: Future<Output = Result<(), TaskError>>,
    {
        let worked = tokio::select! {
            res = work => res,
            _ = self.token.cancelled() => Ok(()),
        };
        let cleaned = cleanup.await;
        worked.and(cleaned)
    }
}

pub(crate) fn panic_reason(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
