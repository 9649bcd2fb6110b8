//! # Task abstractions and specifications.
//!
//! - [`Task`] - trait for implementing async cancelable work
//! - [`TaskFn`] - function-based task implementation
//! - [`TaskRef`] - shared reference to a task (`Arc<dyn Task>`)
//! - [`Worker`] - registration bundling a task with its ordering and retry policy

mod func;
mod spec;
mod task;

pub use func::{TaskFn, bind_task};
pub use spec::{ReadyPolicy, Worker};
pub use task::{Task, TaskRef};
