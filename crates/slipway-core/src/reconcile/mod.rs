//! Convergence of a set of supervised watchers to a desired set.
//!
//! A [`Reconciler`] receives snapshots of watch specifications. For each snapshot it keeps
//! the watchers whose name is still desired, supervises a new one for every new name and
//! stops the rest, waiting for them to drain before the next snapshot is processed. At
//! most one watcher per name is ever alive.

use std::{collections::BTreeSet, sync::Arc};

use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info, warn};

use crate::{Process, Supervisor, TaskError, TaskFn, Worker};

/// Builds watchers for one kind of watch specification.
pub trait WatchMaker: Send + Sync + 'static {
    type Spec: Send + 'static;

    /// Stable name derived from the content of `spec`.
    fn watch_name(&self, spec: &Self::Spec) -> String;

    /// Constructs the worker for a spec whose name is not being watched yet.
    fn make_watch(&self, spec: &Self::Spec) -> Result<Worker, TaskError>;
}

/// What a single reconciliation pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub started: Vec<String>,
    pub kept: Vec<String>,
    pub stopped: Vec<String>,
}

impl ReconcileReport {
    /// Returns `true` if the pass neither started nor stopped anything.
    #[inline]
    pub fn is_noop(&self) -> bool {
        self.started.is_empty() && self.stopped.is_empty()
    }
}

pub struct Reconciler<M: WatchMaker> {
    sup: Supervisor,
    maker: M,
    watched: BTreeSet<String>,
}

impl<M: WatchMaker> Reconciler<M> {
    pub fn new(sup: Supervisor, maker: M) -> Self {
        Self {
            sup,
            maker,
            watched: BTreeSet::new(),
        }
    }

    /// Names currently under supervision by this reconciler.
    pub fn watched(&self) -> impl Iterator<Item = &str> {
        self.watched.iter().map(String::as_str)
    }

    /// Applies one desired snapshot.
    ///
    /// Returns only after every watcher absent from `desired` has terminated.
    pub async fn reconcile<I>(&mut self, desired: I) -> ReconcileReport
    where
        I: IntoIterator<Item = M::Spec>,
    {
        let mut report = ReconcileReport::default();
        let mut found = BTreeSet::new();

        for spec in desired {
            let name = self.maker.watch_name(&spec);
            if found.contains(&name) {
                continue;
            }

            // A watcher that died on its own (no retry) is replaced rather than kept.
            if self.watched.contains(&name) && self.sup.is_live(&name) {
                report.kept.push(name.clone());
                found.insert(name);
                continue;
            }

            let worker = match self.maker.make_watch(&spec) {
                Ok(worker) => worker.named(name.clone()),
                Err(e) => {
                    warn!(watch = %name, error = %e, "failed to create watch");
                    continue;
                }
            };
            match self.sup.supervise(worker) {
                Ok(()) => {
                    info!(watch = %name, "watch added");
                    report.started.push(name.clone());
                    found.insert(name);
                }
                Err(e) => warn!(watch = %name, error = %e, "failed to supervise watch"),
            }
        }

        let stale: Vec<String> = self.watched.difference(&found).cloned().collect();
        for name in &stale {
            info!(watch = %name, "watch removed");
            self.sup.stop(name);
        }
        for name in &stale {
            self.sup.wait(name).await;
        }

        self.watched = found;
        report.stopped = stale;
        report
    }

    /// Turns the reconciler into a worker fed by `snapshots`.
    ///
    /// The worker is ready as soon as it listens; it returns when the channel closes or
    /// shutdown is requested.
    pub fn into_worker(
        self,
        name: impl Into<String>,
        snapshots: mpsc::Receiver<Vec<M::Spec>>,
    ) -> Worker {
        let state = Arc::new(Mutex::new((self, snapshots)));

        let task = TaskFn::arc(name, move |p: Process| {
            let state = Arc::clone(&state);
            async move {
                let mut guard = state.lock().await;
                let (reconciler, rx) = &mut *guard;
                p.ready();

                loop {
                    tokio::select! {
                        snapshot = rx.recv() => match snapshot {
                            Some(specs) => {
                                debug!(count = specs.len(), "processing watch snapshot");
                                let report = reconciler.reconcile(specs).await;
                                debug!(
                                    started = report.started.len(),
                                    kept = report.kept.len(),
                                    stopped = report.stopped.len(),
                                    "watch snapshot applied",
                                );
                            }
                            None => return Ok(()),
                        },
                        _ = p.cancelled() => return Ok(()),
                    }
                }
            }
        });

        Worker::new(task).explicit_ready()
    }
}
