use std::{sync::Arc, time::Duration};

use tracing::{debug, trace};

use crate::{
    Event, EventKind, Process, ReadyPolicy, Supervisor, TaskError, TaskFailure, TaskState, Worker,
    process::panic_reason, state::TaskCell,
};

/// Drives one registered task from `Blocked` to `Terminated`.
pub(super) async fn drive(sup: Supervisor, cell: Arc<TaskCell>, worker: Worker) {
    sup.transition(&cell, TaskState::Blocked, Event::new(EventKind::TaskBlocked));

    let unblocked = tokio::select! {
        _ = cell.token.cancelled() => false,
        _ = sup.wait_requirements(&cell.requires) => true,
    };

    if unblocked {
        if let Some(failure) = attempts(&sup, &cell, &worker).await {
            sup.record_failure(failure);
        }
    } else {
        trace!(task = %cell.name, "shutdown while blocked; never started");
    }

    sup.transition(&cell, TaskState::Terminated, Event::new(EventKind::TaskTerminated));
    sup.terminated();
}

/// Runs attempts until success, cancellation or a non-retried error.
async fn attempts(sup: &Supervisor, cell: &Arc<TaskCell>, worker: &Worker) -> Option<TaskFailure> {
    let policy = sup.config().backoff;
    let mut delay: Option<Duration> = None;
    let mut attempt: u32 = 0;

    loop {
        attempt += 1;
        sup.transition(
            cell,
            TaskState::Starting,
            Event::new(EventKind::TaskStarting).with_attempt(attempt),
        );

        let result = run_once(sup, cell, worker).await;
        // Implicit OnStart readiness does not reset the backoff.
        let signalled = cell.take_ready_in_attempt();
        if signalled && worker.ready_policy() == ReadyPolicy::Explicit {
            delay = None;
        }

        let err = match result {
            Ok(()) => return None,
            Err(e) if e.is_canceled() => return None,
            Err(e) => e,
        };

        sup.publish(
            Event::new(EventKind::TaskFailed)
                .with_task(&cell.name)
                .with_attempt(attempt)
                .with_reason(err.to_string()),
        );

        let failure = TaskFailure {
            task: cell.name.to_string(),
            error: err,
        };
        if !worker.retries() || cell.token.is_cancelled() {
            return Some(failure);
        }

        let wait = policy.next(delay);
        delay = Some(wait);
        sup.transition(
            cell,
            TaskState::Retrying,
            Event::new(EventKind::BackoffScheduled)
                .with_attempt(attempt)
                .with_delay_ms(u32::try_from(wait.as_millis()).unwrap_or(u32::MAX))
                .with_reason(failure.error.to_string()),
        );

        tokio::select! {
            _ = tokio::time::sleep(wait) => {}
            _ = cell.token.cancelled() => return Some(failure),
        }
    }
}

/// One attempt: spawn the work function, wait for it and its sub-units.
async fn run_once(sup: &Supervisor, cell: &Arc<TaskCell>, worker: &Worker) -> Result<(), TaskError> {
    let attempt_token = cell.token.child_token();
    let process = Process::new(sup.clone(), Arc::clone(cell), attempt_token.clone());
    let children = process.children();

    sup.transition(cell, TaskState::Running, Event::new(EventKind::TaskRunning));
    if worker.ready_policy() == ReadyPolicy::OnStart {
        sup.mark_ready(cell);
    }

    let task = Arc::clone(worker.task());
    let mut handle = tokio::spawn(async move { task.run(process).await });

    // Cancellation is checked first so a stop always surfaces as `ShuttingDown`.
    let joined = tokio::select! {
        biased;
        _ = cell.token.cancelled() => {
            sup.transition(cell, TaskState::ShuttingDown, Event::new(EventKind::TaskShuttingDown));
            handle.await
        }
        res = &mut handle => res,
    };

    attempt_token.cancel();
    let child_err = children.drain().await;

    let result = match joined {
        Ok(res) => res,
        Err(e) if e.is_panic() => Err(TaskError::Panicked {
            reason: panic_reason(e.into_panic()),
        }),
        Err(e) => Err(TaskError::fail(e.to_string())),
    };

    match (result, child_err) {
        (Ok(()), Some(err)) => {
            debug!(task = %cell.name, "work returned cleanly but a sub-unit failed");
            Err(err)
        }
        (result, _) => result,
    }
}
