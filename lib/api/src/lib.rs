//! HTTP access to the roadfleet backend.
//!
//! [`ApiClient`] implements [`roadfleet_access::AuthBackend`] over reqwest.
//! Errors from the server are reduced to the `detail` message it sends, or
//! to the raw body when there is none.

pub mod client;
pub mod config;
pub mod error;

pub use client::ApiClient;
pub use config::ApiConfig;
pub use error::ApiClientError;
