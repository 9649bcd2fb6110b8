mod bus;
pub(crate) use bus::Bus;
pub use bus::Subscribe;

use std::{sync::Arc, time::Instant};

/// Kind of a supervisor lifecycle event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    // management
    TaskAdded,
    TaskBlocked,

    // lifecycle
    TaskStarting,
    TaskRunning,
    TaskReady,
    TaskFailed,
    BackoffScheduled,
    TaskShuttingDown,
    TaskTerminated,

    // shutdown
    ShutdownRequested,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::TaskAdded => "task_added",
            EventKind::TaskBlocked => "task_blocked",
            EventKind::TaskStarting => "task_starting",
            EventKind::TaskRunning => "task_running",
            EventKind::TaskReady => "task_ready",
            EventKind::TaskFailed => "task_failed",
            EventKind::BackoffScheduled => "backoff_scheduled",
            EventKind::TaskShuttingDown => "task_shutting_down",
            EventKind::TaskTerminated => "task_terminated",
            EventKind::ShutdownRequested => "shutdown_requested",
        }
    }
}

/// Lifecycle event published by the supervisor to every [`Subscribe`]r.
#[derive(Debug, Clone)]
pub struct Event {
    /// Publication order across the whole supervisor.
    pub seq: u64,
    pub at: Instant,
    pub kind: EventKind,
    pub task: Option<Arc<str>>,
    pub reason: Option<String>,
    pub attempt: Option<u32>,
    pub delay_ms: Option<u32>,
}

impl Event {
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: 0,
            at: Instant::now(),
            kind,
            task: None,
            reason: None,
            attempt: None,
            delay_ms: None,
        }
    }

    pub fn with_task(mut self, task: &Arc<str>) -> Self {
        self.task = Some(Arc::clone(task));
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_attempt(mut self, attempt: u32) -> Self {
        self.attempt = Some(attempt);
        self
    }

    pub fn with_delay_ms(mut self, delay_ms: u32) -> Self {
        self.delay_ms = Some(delay_ms);
        self
    }

    #[inline]
    pub fn task_name(&self) -> Option<&str> {
        self.task.as_deref()
    }
}
