use std::sync::Arc;

use async_trait::async_trait;

use crate::{Process, TaskError};

/// Unit of work run by the supervisor.
///
/// `run` is called once per attempt. Implementations must return promptly after
/// [`Process::cancelled`] resolves and release whatever they acquired on every exit path.
#[async_trait]
pub trait Task: Send + Sync + 'static {
    fn name(&self) -> &str;

    async fn run(&self, p: Process) -> Result<(), TaskError>;
}

pub type TaskRef = Arc<dyn Task>;
