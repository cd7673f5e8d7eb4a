//! Library catalog client.
//!
//! [`application::catalog::CatalogService`] is the entry point: it reads
//! through the tag-invalidated [`cache::QueryStore`] and sends writes to the
//! remote catalog via [`infra::http::ApiClient`].

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
