use crate::TaskRef;

/// When a running task counts as ready for its dependents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReadyPolicy {
    /// Ready as soon as the work function starts.
    #[default]
    OnStart,
    /// Ready once the work function calls [`crate::Process::ready`].
    Explicit,
}

/// Registration of a task with the supervisor.
#[derive(Clone)]
pub struct Worker {
    name: String,
    task: TaskRef,
    requires: Vec<String>,
    retry: bool,
    ready: ReadyPolicy,
}

impl Worker {
    /// Creates a worker named after its task.
    pub fn new(task: TaskRef) -> Self {
        Self {
            name: task.name().to_string(),
            task,
            requires: Vec::new(),
            retry: false,
            ready: ReadyPolicy::OnStart,
        }
    }

    /// Overrides the registration name.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Names that must be ready before this worker starts.
    pub fn requires<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.requires.extend(names.into_iter().map(Into::into));
        self
    }

    /// Restart the work function with backoff when it returns an error.
    pub fn retry(mut self, retry: bool) -> Self {
        self.retry = retry;
        self
    }

    /// Wait for an explicit [`crate::Process::ready`] call before releasing dependents.
    pub fn explicit_ready(mut self) -> Self {
        self.ready = ReadyPolicy::Explicit;
        self
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn task(&self) -> &TaskRef {
        &self.task
    }

    #[inline]
    pub fn requirements(&self) -> &[String] {
        &self.requires
    }

    #[inline]
    pub fn retries(&self) -> bool {
        self.retry
    }

    #[inline]
    pub fn ready_policy(&self) -> ReadyPolicy {
        self.ready
    }
}

impl std::fmt::Debug for Worker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Worker")
            .field("name", &self.name)
            .field("requires", &self.requires)
            .field("retry", &self.retry)
            .field("ready", &self.ready)
            .finish()
    }
}
