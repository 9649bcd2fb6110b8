//! Dependency-ordered task supervision for the slipway daemon.
//!
//! A [`Supervisor`] runs named [`Worker`]s. A worker starts only once every worker it
//! requires has reported ready, failing workers may be retried with exponential backoff,
//! and shutdown is a cooperative broadcast observed through each worker's [`Process`].
//!
//! The [`reconcile`] module builds on top of it to keep a set of background watchers in
//! line with a periodically supplied desired set.

mod error;
pub use error::{SupervisorError, TaskError, TaskFailure};

mod backoff;
pub use backoff::BackoffPolicy;

mod state;
pub use state::TaskState;

mod event;
pub use event::{Event, EventKind, Subscribe};

mod task;
pub use task::{ReadyPolicy, Task, TaskFn, TaskRef, Worker, bind_task};

mod process;
pub use process::Process;

mod supervisor;
pub use supervisor::{Supervisor, SupervisorBuilder, SupervisorConfig};

pub mod reconcile;
pub use reconcile::{ReconcileReport, Reconciler, WatchMaker};

pub mod prelude {
    pub use crate::{Process, Supervisor, TaskError, TaskFn, Worker};
}
