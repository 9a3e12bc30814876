//! Backend seam for the auth gateway.
//!
//! `AuthBackend` describes the `/auth/*` endpoints. The production
//! implementation is the HTTP client in `roadfleet-api`; tests substitute an
//! in-memory double. Backends return response bodies as received: turning a
//! body into a [`Session`](crate::session::Session) is the gateway's job, so
//! normalization happens in exactly one place.

use async_trait::async_trait;
use secrecy::SecretString;
use serde::Deserialize;
use serde_json::Value as JsonValue;

use crate::error::BackendError;
use crate::session::BearerToken;

/// Email and password for `POST /auth/login`.
#[derive(Debug)]
pub struct Credentials {
    /// Account email.
    pub email: String,
    /// Account password; never logged.
    pub password: SecretString,
}

impl Credentials {
    /// Creates a credential pair.
    #[must_use]
    pub fn new(email: impl Into<String>, password: SecretString) -> Self {
        Self {
            email: email.into(),
            password,
        }
    }
}

/// Body of `POST /auth/register`.
#[derive(Debug)]
pub struct Registration {
    /// Display name for the new account.
    pub name: String,
    /// Email and password; reused verbatim if registration falls back to login.
    pub credentials: Credentials,
}

impl Registration {
    /// Creates a registration request.
    #[must_use]
    pub fn new(name: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            name: name.into(),
            credentials,
        }
    }
}

/// Successful body of `POST /auth/login` and `POST /auth/register`.
///
/// Both fields are optional here so that a success response missing either
/// one is reported as an authentication failure rather than a decode error.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AuthResponse {
    /// The bearer token.
    #[serde(default)]
    pub access_token: Option<String>,
    /// The user payload, normalized later by the gateway.
    #[serde(default)]
    pub user: Option<JsonValue>,
    /// Token lifetime in seconds, when the server reports it.
    #[serde(default)]
    pub expires_in: Option<u64>,
}

/// Successful body of `POST /auth/refresh`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TokenResponse {
    /// The replacement bearer token.
    #[serde(default)]
    pub access_token: Option<String>,
    /// Token lifetime in seconds, when the server reports it.
    #[serde(default)]
    pub expires_in: Option<u64>,
}

/// The authentication endpoints of the fleet backend.
#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// Exchanges credentials for a token and user.
    async fn login(&self, credentials: &Credentials) -> Result<AuthResponse, BackendError>;

    /// Creates an account and signs it in.
    async fn register(&self, registration: &Registration) -> Result<AuthResponse, BackendError>;

    /// Tells the server the token is no longer in use.
    async fn logout(&self, token: &BearerToken) -> Result<(), BackendError>;

    /// Returns the server's current view of the token's user.
    async fn me(&self, token: &BearerToken) -> Result<JsonValue, BackendError>;

    /// Exchanges a token for a fresh one.
    async fn refresh(&self, token: &BearerToken) -> Result<TokenResponse, BackendError>;
}
