use std::borrow::Borrow;

use slipway_core::{Event, EventKind};
use tracing::{debug, error, info, trace};

trait View {
    fn as_task(&self) -> &str;
    fn as_reason(&self) -> &str;
    fn attempt(&self) -> u32;
    fn delay_ms(&self) -> u32;
    fn kind(&self) -> EventKind;
}

impl<T> View for T
where
    T: Borrow<Event>,
{
    #[inline]
    fn as_task(&self) -> &str {
        self.borrow().task_name().unwrap_or("unknown")
    }
    #[inline]
    fn as_reason(&self) -> &str {
        self.borrow().reason.as_deref().unwrap_or("unknown")
    }
    #[inline]
    fn attempt(&self) -> u32 {
        self.borrow().attempt.unwrap_or(0)
    }
    #[inline]
    fn delay_ms(&self) -> u32 {
        self.borrow().delay_ms.unwrap_or(0)
    }
    #[inline]
    fn kind(&self) -> EventKind {
        self.borrow().kind
    }
}

#[inline]
pub fn message_for(kind: EventKind) -> &'static str {
    match kind {
        // management
        EventKind::TaskAdded => "task registered",
        EventKind::TaskBlocked => "task waiting for its requirements",

        // lifecycle
        EventKind::TaskStarting => "task is starting",
        EventKind::TaskRunning => "task running",
        EventKind::TaskReady => "task ready; dependents may start",
        EventKind::TaskFailed => "task failed",
        EventKind::BackoffScheduled => "retry scheduled after failure",
        EventKind::TaskShuttingDown => "task shutting down",
        EventKind::TaskTerminated => "task terminated",

        // shutdown
        EventKind::ShutdownRequested => "shutdown requested",
    }
}

/// Logs one supervisor event at the level matching its kind.
pub fn log_event<E: Borrow<Event>>(e: E) {
    let msg = message_for(e.kind());

    match e.kind() {
        // management
        EventKind::TaskAdded => debug!(task = e.as_task(), "{msg}"),
        EventKind::TaskBlocked => trace!(task = e.as_task(), "{msg}"),

        // lifecycle
        EventKind::TaskStarting => {
            debug!(task = e.as_task(), attempt = e.attempt(), "{msg}")
        }
        EventKind::TaskRunning => trace!(task = e.as_task(), "{msg}"),
        EventKind::TaskReady => info!(task = e.as_task(), "{msg}"),
        EventKind::TaskFailed => error!(
            task = e.as_task(),
            attempt = e.attempt(),
            reason = e.as_reason(),
            "{msg}"
        ),
        EventKind::BackoffScheduled => debug!(
            task = e.as_task(),
            attempt = e.attempt(),
            delay_ms = e.delay_ms(),
            reason = e.as_reason(),
            "{msg}",
        ),
        EventKind::TaskShuttingDown => debug!(task = e.as_task(), "{msg}"),
        EventKind::TaskTerminated => info!(task = e.as_task(), "{msg}"),

        // shutdown
        EventKind::ShutdownRequested => info!("{msg}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    #[test]
    fn view_defaults_for_missing_fields() {
        let event = Event::new(EventKind::ShutdownRequested);
        assert_eq!(event.as_task(), "unknown");
        assert_eq!(event.attempt(), 0);

        let task: Arc<str> = Arc::from("nat");
        let event = Event::new(EventKind::BackoffScheduled)
            .with_task(&task)
            .with_attempt(3)
            .with_delay_ms(400)
            .with_reason("exit code: 4");
        assert_eq!(event.as_task(), "nat");
        assert_eq!(event.attempt(), 3);
        assert_eq!(event.delay_ms(), 400);
        assert_eq!(event.as_reason(), "exit code: 4");
    }

    #[test]
    fn logging_without_subscriber_is_harmless() {
        let task: Arc<str> = Arc::from("api");
        log_event(Event::new(EventKind::TaskFailed).with_task(&task));
        log_event(&Event::new(EventKind::ShutdownRequested));
    }
}
