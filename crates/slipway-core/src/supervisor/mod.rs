mod actor;

use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex, MutexGuard,
        atomic::{AtomicBool, Ordering},
    },
};

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use crate::{
    BackoffPolicy, Event, EventKind, Subscribe, SupervisorError, TaskFailure, TaskState, Worker,
    event::Bus, state::TaskCell,
};

/// Supervisor-wide settings.
#[derive(Debug, Clone, Default)]
pub struct SupervisorConfig {
    pub backoff: BackoffPolicy,
}

pub struct SupervisorBuilder {
    config: SupervisorConfig,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl SupervisorBuilder {
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers.extend(subscribers);
        self
    }

    pub fn with_subscriber(mut self, subscriber: Arc<dyn Subscribe>) -> Self {
        self.subscribers.push(subscriber);
        self
    }

    /// Builds the supervisor. Must be called inside a tokio runtime.
    pub fn build(self) -> Supervisor {
        let token = CancellationToken::new();
        Supervisor {
            inner: Arc::new(Inner {
                config: self.config,
                bus: Bus::new(self.subscribers),
                token,
                shutdown_once: AtomicBool::new(false),
                registry: Mutex::new(HashMap::new()),
                registered: watch::Sender::new(0),
                live: watch::Sender::new(0),
                failures: Mutex::new(Vec::new()),
            }),
        }
    }
}

/// Process-wide registry of named tasks.
///
/// Cheap to clone; all clones drive the same set of tasks.
#[derive(Clone)]
pub struct Supervisor {
    inner: Arc<Inner>,
}

struct Inner {
    config: SupervisorConfig,
    bus: Bus,
    token: CancellationToken,
    shutdown_once: AtomicBool,
    /// Latest registration per name; terminated entries stay until the name is reused.
    registry: Mutex<HashMap<String, Arc<TaskCell>>>,
    /// Bumped on every registration so blocked tasks can re-check their requirements.
    registered: watch::Sender<u64>,
    /// Number of tasks not yet terminated.
    live: watch::Sender<usize>,
    failures: Mutex<Vec<TaskFailure>>,
}

impl Default for Supervisor {
    fn default() -> Self {
        Self::new()
    }
}

impl Supervisor {
    /// Supervisor with default settings and no subscribers.
    pub fn new() -> Self {
        Self::builder(SupervisorConfig::default()).build()
    }

    pub fn builder(config: SupervisorConfig) -> SupervisorBuilder {
        SupervisorBuilder {
            config,
            subscribers: Vec::new(),
        }
    }

    /// Registers a worker and schedules it to start once its requirements are ready.
    ///
    /// Fails with [`SupervisorError::DuplicateName`] while a task with the same name is
    /// still alive.
    #[instrument(level = "debug", skip(self, worker), fields(task = %worker.name()))]
    pub fn supervise(&self, worker: Worker) -> Result<(), SupervisorError> {
        let cell = {
            let mut registry = self.registry();
            if let Some(existing) = registry.get(worker.name())
                && !existing.state().is_terminal()
            {
                return Err(SupervisorError::DuplicateName(worker.name().to_string()));
            }

            let cell = Arc::new(TaskCell::new(
                worker.name(),
                worker.requirements().to_vec(),
                self.inner.token.child_token(),
            ));
            registry.insert(worker.name().to_string(), Arc::clone(&cell));
            self.inner.live.send_modify(|n| *n += 1);
            cell
        };

        self.publish(Event::new(EventKind::TaskAdded).with_task(&cell.name));
        self.inner.registered.send_modify(|g| *g += 1);
        debug!(requires = ?cell.requires, retry = worker.retries(), "task registered");

        tokio::spawn(actor::drive(self.clone(), cell, worker));
        Ok(())
    }

    /// Broadcasts the shutdown signal to every task. Idempotent.
    pub fn shutdown(&self) {
        if self.inner.shutdown_once.swap(true, Ordering::SeqCst) {
            return;
        }
        info!("supervisor shutdown requested");
        self.publish(Event::new(EventKind::ShutdownRequested));
        self.inner.token.cancel();
    }

    #[inline]
    pub fn is_shutting_down(&self) -> bool {
        self.inner.token.is_cancelled()
    }

    /// Token cancelled on [`Supervisor::shutdown`].
    pub fn token(&self) -> CancellationToken {
        self.inner.token.clone()
    }

    /// Waits until every supervised task terminated and returns the unrecovered failures
    /// in termination order.
    pub async fn run(&self) -> Vec<TaskFailure> {
        let mut live = self.inner.live.subscribe();
        let _ = live.wait_for(|n| *n == 0).await;
        self.failures()
    }

    /// Failures recorded so far.
    pub fn failures(&self) -> Vec<TaskFailure> {
        self.inner
            .failures
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Asks a single task to stop. Returns `false` if no live task has that name.
    pub fn stop(&self, name: &str) -> bool {
        match self.lookup(name) {
            Some(cell) if !cell.state().is_terminal() => {
                debug!(task = name, "stop requested");
                cell.token.cancel();
                true
            }
            _ => false,
        }
    }

    /// Waits for the task registered under `name` to terminate. Returns immediately for
    /// unknown names.
    pub async fn wait(&self, name: &str) {
        if let Some(cell) = self.lookup(name) {
            cell.wait_terminated().await;
        }
    }

    /// Current state of the latest task registered under `name`.
    pub fn state(&self, name: &str) -> Option<TaskState> {
        self.lookup(name).map(|cell| cell.state())
    }

    /// Returns `true` if a task with this name is registered and not terminated.
    pub fn is_live(&self, name: &str) -> bool {
        self.state(name).is_some_and(|s| !s.is_terminal())
    }

    /// Liveness check for blocked tasks waiting on names nobody registered.
    pub fn unsatisfied(&self) -> Vec<SupervisorError> {
        let registry = self.registry();
        let mut out: Vec<SupervisorError> = registry
            .values()
            .filter(|cell| cell.state() == TaskState::Blocked)
            .filter_map(|cell| {
                let missing: Vec<String> = cell
                    .requires
                    .iter()
                    .filter(|r| !registry.contains_key(r.as_str()))
                    .cloned()
                    .collect();
                (!missing.is_empty()).then(|| SupervisorError::DependencyUnsatisfiable {
                    task: cell.name.to_string(),
                    missing,
                })
            })
            .collect();
        out.sort_by(|a, b| a.to_string().cmp(&b.to_string()));
        out
    }

    // ---------------------------------------------------------------------
    // crate internals
    // ---------------------------------------------------------------------

    pub(crate) fn config(&self) -> &SupervisorConfig {
        &self.inner.config
    }

    pub(crate) fn publish(&self, event: Event) {
        self.inner.bus.publish(event);
    }

    pub(crate) fn transition(&self, cell: &TaskCell, state: TaskState, event: Event) {
        cell.set_state(state);
        self.publish(event.with_task(&cell.name));
    }

    pub(crate) fn mark_ready(&self, cell: &TaskCell) {
        if cell.try_ready() {
            self.publish(Event::new(EventKind::TaskReady).with_task(&cell.name));
            cell.latch_ready();
        }
    }

    pub(crate) fn record_failure(&self, failure: TaskFailure) {
        self.inner
            .failures
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(failure);
    }

    pub(crate) fn terminated(&self) {
        self.inner.live.send_modify(|n| *n = n.saturating_sub(1));
    }

    /// Resolves once every name in `requires` has been ready at least once.
    pub(crate) async fn wait_requirements(&self, requires: &[String]) {
        for name in requires {
            self.wait_requirement(name).await;
        }
    }

    async fn wait_requirement(&self, name: &str) {
        let mut registered = self.inner.registered.subscribe();
        loop {
            match self.lookup(name) {
                Some(cell) if cell.has_been_ready() => return,
                Some(cell) => {
                    tokio::select! {
                        _ = cell.wait_ready() => return,
                        // The name may be re-registered with a fresh cell.
                        _ = registered.changed() => continue,
                    }
                }
                None => {
                    let _ = registered.changed().await;
                }
            }
        }
    }

    fn lookup(&self, name: &str) -> Option<Arc<TaskCell>> {
        self.registry().get(name).cloned()
    }

    fn registry(&self) -> MutexGuard<'_, HashMap<String, Arc<TaskCell>>> {
        self.inner
            .registry
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
