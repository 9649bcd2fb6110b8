use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::warn;

use super::Event;

/// Receiver of supervisor lifecycle events.
///
/// Each subscriber gets its own bounded queue and worker; a slow subscriber only loses
/// its own events once its queue is full.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    async fn on_event(&self, event: &Event);

    fn name(&self) -> &'static str;

    fn queue_capacity(&self) -> usize {
        1024
    }
}

struct Queue {
    name: &'static str,
    tx: mpsc::Sender<Arc<Event>>,
}

pub(crate) struct Bus {
    seq: AtomicU64,
    queues: Vec<Queue>,
}

impl Bus {
    /// Spawns one delivery worker per subscriber; must be called inside a tokio runtime.
    pub(crate) fn new(subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        let queues = subscribers
            .into_iter()
            .map(|sub| {
                let (tx, mut rx) = mpsc::channel::<Arc<Event>>(sub.queue_capacity().max(1));
                let name = sub.name();
                tokio::spawn(async move {
                    while let Some(event) = rx.recv().await {
                        sub.on_event(&event).await;
                    }
                });
                Queue { name, tx }
            })
            .collect();

        Self {
            seq: AtomicU64::new(0),
            queues,
        }
    }

    pub(crate) fn publish(&self, mut event: Event) {
        event.seq = self.seq.fetch_add(1, Ordering::SeqCst);
        if self.queues.is_empty() {
            return;
        }

        let event = Arc::new(event);
        for q in &self.queues {
            if let Err(e) = q.tx.try_send(Arc::clone(&event)) {
                warn!(subscriber = q.name, kind = ?event.kind, "event dropped: {e}");
            }
        }
    }
}
