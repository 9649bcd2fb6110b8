use std::{future::Future, sync::Arc};

use async_trait::async_trait;

use crate::{Process, Task, TaskError, TaskRef};

/// Task backed by a closure returning a future.
pub struct TaskFn<F> {
    name: String,
    f: F,
}

impl<F, Fut> TaskFn<F>
where
    F: Fn(Process) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), TaskError>> + Send + 'static,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }

    pub fn arc(name: impl Into<String>, f: F) -> TaskRef {
        Arc::new(Self::new(name, f))
    }
}

/// Builds a task from a work function taking an extra bound argument.
///
/// Every attempt receives its own clone of `arg`.
pub fn bind_task<A, G, Fut>(name: impl Into<String>, arg: A, f: G) -> TaskRef
where
    A: Clone + Send + Sync + 'static,
    G: Fn(Process, A) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), TaskError>> + Send + 'static,
{
    TaskFn::arc(name, move |p: Process| f(p, arg.clone()))
}

#[async_trait]
impl<F, Fut> Task for TaskFn<F>
where
    F: Fn(Process) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), TaskError>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, p: Process) -> Result<(), TaskError> {
        (self.f)(p).await
    }
}
