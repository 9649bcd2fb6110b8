use std::time::Duration;

use slipway_core::{Process, TaskError, TaskFn, Worker};
use tracing::{info, warn};

use super::API;

pub const PROBE: &str = "probe";

const PROBE_TIMEOUT: Duration = Duration::from_secs(3);

/// Checks once that the control API answers `GET /api/tables`.
///
/// Retried with backoff until the API responds or shutdown is requested.
pub fn probe_worker(base_url: String) -> Worker {
    let task = TaskFn::arc(PROBE, move |p: Process| {
        let url = format!("{base_url}/api/tables");
        async move {
            let client = reqwest::Client::builder()
                .timeout(PROBE_TIMEOUT)
                .build()
                .map_err(|e| TaskError::fail(format!("http client: {e}")))?;

            let response = tokio::select! {
                res = client.get(&url).send() => res,
                _ = p.cancelled() => return Err(TaskError::Canceled),
            };

            match response {
                Ok(resp) if resp.status().is_success() => {
                    info!(%url, "control API reachable");
                    Ok(())
                }
                Ok(resp) => {
                    warn!(%url, status = %resp.status(), "control API answered with an error");
                    Err(TaskError::fail(format!("unexpected status {}", resp.status())))
                }
                Err(e) => {
                    warn!(%url, error = %e, "control API unreachable");
                    Err(TaskError::fail(format!("probe failed: {e}")))
                }
            }
        }
    });

    Worker::new(task).requires([API]).retry(true)
}
