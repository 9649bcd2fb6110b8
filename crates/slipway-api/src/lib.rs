//! Route table store and its local control surface.
//!
//! [`Interceptor`] keeps the named route tables and the DNS search path. Every mutation
//! bumps a generation counter that consumers can watch. With the `http` feature the store
//! is exposed through [`HttpApi`].

mod error;
pub use error::ApiError;

mod dns;
pub use dns::{DnsFlush, SystemFlusher};

mod store;
pub use store::Interceptor;

mod handler;
pub use handler::ApiHandler;

mod adapter;
pub use adapter::InterceptorAdapter;

#[cfg(feature = "http")]
mod http;

#[cfg(feature = "http")]
pub use http::HttpApi;

#[cfg(feature = "http")]
pub use axum;
