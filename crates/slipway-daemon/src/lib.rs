//! Building blocks of the `slipwayd` binary.
//!
//! The daemon supervises these workers:
//! - `nat`: owns the redirect chain for the lifetime of the process
//! - `api`: serves the control API and `/metrics`
//! - `redirect`: keeps the redirect rules in line with the route tables (requires `nat`)
//! - `probe`: checks that the control API answers (requires `api`)
//! - `signal`: turns SIGINT/SIGTERM into a supervisor shutdown

pub mod config;
pub use config::{ConfigError, DaemonConfig};

pub mod limits;

pub mod tasks;
