//! Prometheus metrics for the slipway supervisor.
//!
//! [`PrometheusMetrics`] is a [`slipway_core::Subscribe`]r: register it with the
//! supervisor and it turns lifecycle events into counters and gauges.
//!
//! ## Example
//! ```rust,ignore
//! let metrics = Arc::new(PrometheusMetrics::new()?);
//! let sup = Supervisor::builder(SupervisorConfig::default())
//!     .with_subscriber(metrics.clone())
//!     .build();
//!
//! // later, in a /metrics handler
//! let body = metrics.encode()?;
//! ```
//!
//! ## Metrics
//! - `slipway_supervisor_events_total{kind}` - Counter
//! - `slipway_task_failures_total{task}` - Counter
//! - `slipway_task_retries_total{task}` - Counter
//! - `slipway_tasks_live` - Gauge
//! - `slipway_tasks_ready` - Gauge
//!
//! ## HTTP Server
//! This crate does NOT serve `/metrics`; the daemon mounts [`PrometheusMetrics::encode`]
//! on its own router.

mod backend;
pub use backend::PrometheusMetrics;

pub use prometheus::{Encoder, Registry, TextEncoder};
