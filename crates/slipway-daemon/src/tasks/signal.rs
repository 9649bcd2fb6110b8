use slipway_core::{Process, TaskError, TaskFn, Worker};
use tracing::info;

pub const SIGNAL: &str = "signal";

/// Requests a supervisor shutdown on SIGINT or SIGTERM.
pub fn signal_worker() -> Worker {
    let task = TaskFn::arc(SIGNAL, |p: Process| async move {
        tokio::select! {
            sig = wait_for_signal() => {
                let sig = sig?;
                info!(signal = sig, "signal received; shutting down");
                p.supervisor().shutdown();
            }
            _ = p.cancelled() => {}
        }
        Ok(())
    });
    Worker::new(task)
}

#[cfg(unix)]
async fn wait_for_signal() -> Result<&'static str, TaskError> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut term = signal(SignalKind::terminate())?;
    tokio::select! {
        res = tokio::signal::ctrl_c() => res.map(|()| "SIGINT").map_err(TaskError::from),
        _ = term.recv() => Ok("SIGTERM"),
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> Result<&'static str, TaskError> {
    tokio::signal::ctrl_c().await?;
    Ok("ctrl-c")
}
