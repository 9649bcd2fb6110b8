//! Data model shared by the slipway crates.
//!
//! Everything here is plain data: route tables pushed through the control surface,
//! the DNS search path, and the protocol tags used by the NAT layer.

mod domain;
pub use domain::*;
