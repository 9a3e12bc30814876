//! Error types for the API client.

use std::fmt;

/// Errors constructing an [`ApiClient`](crate::ApiClient).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiClientError {
    /// The base URL is not an http(s) URL.
    InvalidBaseUrl { url: String },
    /// The underlying HTTP client could not be built.
    ClientBuild { details: String },
}

impl fmt::Display for ApiClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidBaseUrl { url } => {
                write!(f, "invalid backend URL '{url}', expected http:// or https://")
            }
            Self::ClientBuild { details } => write!(f, "failed to build HTTP client: {details}"),
        }
    }
}

impl std::error::Error for ApiClientError {}
