use async_trait::async_trait;
use slipway_core::{Event, Subscribe};

use crate::subscriber::view::log_event;

/// Events buffered for the journal before new ones are dropped.
pub const DEFAULT_JOURNAL_QUEUE: usize = 2048;

/// Writes every supervisor event to the `tracing` log.
#[derive(Debug, Clone, Copy)]
pub struct Journal {
    capacity: usize,
}

impl Default for Journal {
    fn default() -> Self {
        Self::new()
    }
}

impl Journal {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_JOURNAL_QUEUE)
    }

    /// A journal whose queue holds `capacity` events; zero is raised to one.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
        }
    }
}

#[async_trait]
impl Subscribe for Journal {
    async fn on_event(&self, event: &Event) {
        log_event(event);
    }
    fn name(&self) -> &'static str {
        "journal"
    }
    fn queue_capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_capacity_is_configurable() {
        assert_eq!(Journal::new().queue_capacity(), DEFAULT_JOURNAL_QUEUE);
        assert_eq!(Journal::with_capacity(64).queue_capacity(), 64);
        assert_eq!(Journal::with_capacity(0).queue_capacity(), 1);
    }
}
