//! HTTP adapter for the remote catalog API.

mod client;
mod error;

pub use client::ApiClient;
pub use error::ApiError;

pub(crate) use client::METRIC_API_REQUEST_MS;
