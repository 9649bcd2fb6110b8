use std::sync::Arc;

use slipway_core::{Process, TaskError, Worker, bind_task};
use tracing::info;

use crate::Translator;

/// Registration name of the translator worker.
pub const WORKER_NAME: &str = "nat";

/// Supervised lifetime of a [`Translator`]: rules are installed on start and removed on
/// shutdown. Ready once the chain is hooked in.
pub fn translator_worker(translator: Arc<Translator>) -> Worker {
    let task = bind_task(WORKER_NAME, translator, |p: Process, translator: Arc<Translator>| async move {
        let work = async {
            translator.enable().await;
            info!(chain = translator.chain(), "redirect chain enabled");
            p.ready();
            p.cancelled().await;
            Ok::<(), TaskError>(())
        };
        let cleanup = async {
            translator.disable().await;
            info!(chain = translator.chain(), "redirect chain removed");
            Ok(())
        };
        p.do_clean(work, cleanup).await
    });
    Worker::new(task).explicit_ready()
}
