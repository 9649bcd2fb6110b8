use std::{
    collections::HashSet,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use prometheus::{Encoder, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use slipway_core::{Event, EventKind, Subscribe};

/// Supervisor metrics in a dedicated registry.
///
/// Cheap to clone; clones share the same collectors.
#[derive(Clone)]
pub struct PrometheusMetrics {
    registry: Registry,
    events_total: IntCounterVec,
    failures_total: IntCounterVec,
    retries_total: IntCounterVec,
    tasks_live: IntGauge,
    tasks_ready: IntGauge,
    ready: Arc<Mutex<HashSet<String>>>,
}

impl PrometheusMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("slipway".to_string()), None)?;

        let events_total = IntCounterVec::new(
            Opts::new("supervisor_events_total", "Supervisor lifecycle events by kind."),
            &["kind"],
        )?;
        let failures_total = IntCounterVec::new(
            Opts::new("task_failures_total", "Failed task attempts."),
            &["task"],
        )?;
        let retries_total = IntCounterVec::new(
            Opts::new("task_retries_total", "Retries scheduled after a failed attempt."),
            &["task"],
        )?;
        let tasks_live = IntGauge::new("tasks_live", "Registered tasks not yet terminated.")?;
        let tasks_ready = IntGauge::new("tasks_ready", "Tasks currently in the ready state.")?;

        registry.register(Box::new(events_total.clone()))?;
        registry.register(Box::new(failures_total.clone()))?;
        registry.register(Box::new(retries_total.clone()))?;
        registry.register(Box::new(tasks_live.clone()))?;
        registry.register(Box::new(tasks_ready.clone()))?;

        Ok(Self {
            registry,
            events_total,
            failures_total,
            retries_total,
            tasks_live,
            tasks_ready,
            ready: Arc::new(Mutex::new(HashSet::new())),
        })
    }

    #[inline]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Text exposition format of every collector.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buf)?;
        String::from_utf8(buf).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }

    /// Content type to serve [`PrometheusMetrics::encode`] with.
    pub fn content_type(&self) -> &'static str {
        prometheus::TEXT_FORMAT
    }

    fn record(&self, event: &Event) {
        self.events_total
            .with_label_values(&[event.kind.as_str()])
            .inc();

        let task = event.task_name().unwrap_or("unknown");
        match event.kind {
            EventKind::TaskAdded => self.tasks_live.inc(),
            EventKind::TaskTerminated => {
                self.tasks_live.dec();
                self.set_ready(task, false);
            }
            EventKind::TaskReady => self.set_ready(task, true),
            EventKind::TaskFailed => {
                self.failures_total.with_label_values(&[task]).inc();
                self.set_ready(task, false);
            }
            EventKind::TaskShuttingDown => self.set_ready(task, false),
            EventKind::BackoffScheduled => {
                self.retries_total.with_label_values(&[task]).inc();
            }
            _ => {}
        }
    }

    fn set_ready(&self, task: &str, ready: bool) {
        let mut set = self.ready.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if ready {
            set.insert(task.to_string());
        } else {
            set.remove(task);
        }
        self.tasks_ready.set(set.len() as i64);
    }
}

#[async_trait]
impl Subscribe for PrometheusMetrics {
    async fn on_event(&self, event: &Event) {
        self.record(event);
    }
    fn name(&self) -> &'static str {
        "prometheus"
    }
    fn queue_capacity(&self) -> usize {
        4096
    }
}
