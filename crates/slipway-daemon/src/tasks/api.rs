use std::sync::Arc;

use axum::{Router, extract::State, http::StatusCode, http::header, response::IntoResponse, routing::get};
use slipway_core::{Process, TaskError, TaskFn, Worker};
use slipway_prometheus::PrometheusMetrics;
use tokio::{net::TcpListener, sync::Mutex};
use tracing::{error, info};

pub const API: &str = "api";

/// `GET /metrics` in the Prometheus text format.
pub fn metrics_router(metrics: Arc<PrometheusMetrics>) -> Router {
    Router::new()
        .route("/metrics", get(render_metrics))
        .with_state(metrics)
}

async fn render_metrics(State(metrics): State<Arc<PrometheusMetrics>>) -> impl IntoResponse {
    match metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, metrics.content_type())],
            body,
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "metrics encoding failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Serves `router` on an already bound listener until shutdown.
///
/// The listener is consumed by the first attempt, so the worker is not retried.
pub fn api_worker(listener: TcpListener, router: Router) -> Worker {
    let slot = Arc::new(Mutex::new(Some(listener)));

    let task = TaskFn::arc(API, move |p: Process| {
        let slot = Arc::clone(&slot);
        let router = router.clone();
        async move {
            let listener = slot
                .lock()
                .await
                .take()
                .ok_or_else(|| TaskError::fail("control API listener already consumed"))?;
            let addr = listener.local_addr()?;
            info!(%addr, "control API listening");

            let stop = p.clone();
            axum::serve(listener, router)
                .with_graceful_shutdown(async move { stop.cancelled().await })
                .await?;

            info!("control API stopped");
            Ok(())
        }
    });
    Worker::new(task)
}
