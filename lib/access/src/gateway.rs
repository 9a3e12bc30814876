//! Auth gateway: credential exchange with the backend.
//!
//! The gateway turns backend responses into sessions and hands them to the
//! [`SessionStore`]. Failures always reach the caller as [`AuthError`]; the
//! gateway never invents a session when the backend is unreachable.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use roadfleet_core::Result;
use secrecy::SecretString;
use tracing::{debug, info, instrument, warn};

use crate::backend::{AuthBackend, AuthResponse, Credentials, Registration};
use crate::error::{AuthError, BackendError};
use crate::identity::Identity;
use crate::session::{BearerToken, Session};
use crate::store::{AttemptTicket, SessionStore};

/// Registration answers with this status when the account already exists.
const ALREADY_REGISTERED_STATUS: u16 = 400;

/// Status the backend uses for an expired or revoked token.
const UNAUTHORIZED_STATUS: u16 = 401;

/// Exchanges credentials for sessions.
pub struct AuthGateway<B> {
    backend: B,
    store: Arc<SessionStore>,
    timeout: Duration,
}

impl<B: AuthBackend> AuthGateway<B> {
    /// Upper bound on a single backend call unless configured otherwise.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

    /// Creates a gateway that records sessions in `store`.
    #[must_use]
    pub fn new(backend: B, store: Arc<SessionStore>) -> Self {
        Self {
            backend,
            store,
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    /// Sets the per-call timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the session store.
    #[must_use]
    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    /// Returns the backend.
    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Signs in with email and password.
    ///
    /// # Errors
    ///
    /// - `Authentication` if the server rejects the credentials or answers
    ///   without a token or user
    /// - `Network` if the server cannot be reached in time
    /// - `Superseded` if another sign-in or a sign-out happened meanwhile
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: SecretString) -> Result<Session, AuthError> {
        let credentials = Credentials::new(email, password);
        let ticket = self.store.begin_attempt();
        let session = self.exchange_login(&credentials).await?;
        self.commit(ticket, session)
    }

    /// Creates an account, or signs in if it already exists.
    ///
    /// Registering twice with the same credentials is equivalent to signing
    /// in: an "already registered" rejection falls back to [`login`](Self::login).
    ///
    /// # Errors
    ///
    /// Same as [`login`](Self::login).
    #[instrument(skip(self, password))]
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: SecretString,
    ) -> Result<Session, AuthError> {
        let registration = Registration::new(name, Credentials::new(email, password));
        let ticket = self.store.begin_attempt();

        let session = match self.bounded(self.backend.register(&registration)).await {
            Ok(response) => session_from(response)?,
            Err(BackendError::Rejected { status, message })
                if status == ALREADY_REGISTERED_STATUS =>
            {
                info!(%message, "account already registered, signing in instead");
                self.exchange_login(&registration.credentials).await?
            }
            Err(e) => return Err(AuthError::from(e).into()),
        };

        self.commit(ticket, session)
    }

    /// Signs out.
    ///
    /// The local session is gone before this returns control to the caller
    /// for the first time; the server is then told best-effort.
    #[instrument(skip(self))]
    pub async fn logout(&self) {
        let token = self.store.bearer_token();
        self.store.clear();

        let Some(token) = token else {
            debug!("logout without a session");
            return;
        };
        if let Err(e) = self.bounded(self.backend.logout(&token)).await {
            warn!(error = %e, "server logout failed, local session already cleared");
        }
    }

    /// Re-reads the current user from the server and replaces the identity.
    ///
    /// # Errors
    ///
    /// `NotAuthenticated` without a session; otherwise as for
    /// [`login`](Self::login). A rejected token also clears the session.
    #[instrument(skip(self))]
    pub async fn current_identity(&self) -> Result<Session, AuthError> {
        let session = self.store.session().ok_or(AuthError::NotAuthenticated)?;
        let ticket = self.store.begin_attempt();

        let payload = self
            .bounded(self.backend.me(session.token()))
            .await
            .map_err(|e| self.token_failure(ticket, e))?;
        let identity = identity_from(payload)?;

        self.commit(ticket, session.with_identity(identity))
    }

    /// Exchanges the current token for a new one.
    ///
    /// # Errors
    ///
    /// Same as [`current_identity`](Self::current_identity).
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Result<Session, AuthError> {
        let session = self.store.session().ok_or(AuthError::NotAuthenticated)?;
        let ticket = self.store.begin_attempt();

        let response = self
            .bounded(self.backend.refresh(session.token()))
            .await
            .map_err(|e| self.token_failure(ticket, e))?;
        let token = token_from(response.access_token)?;

        self.commit(ticket, session.with_token(token))
    }

    async fn exchange_login(&self, credentials: &Credentials) -> Result<Session, AuthError> {
        let response = self
            .bounded(self.backend.login(credentials))
            .await
            .map_err(AuthError::from)?;
        let session = session_from(response)?;
        debug!(user_id = %session.identity().id(), role = %session.role(), "credentials accepted");
        Ok(session)
    }

    fn commit(&self, ticket: AttemptTicket, session: Session) -> Result<Session, AuthError> {
        if self.store.commit(ticket, session.clone()) {
            Ok(session)
        } else {
            Err(AuthError::Superseded.into())
        }
    }

    /// Classifies a failure of a call made with the current token.
    ///
    /// A rejected token clears the session only while `ticket` is still
    /// current; a rejection that arrives after a newer sign-in or sign-out
    /// is `Superseded`.
    fn token_failure(&self, ticket: AttemptTicket, err: BackendError) -> AuthError {
        if err.status() != Some(UNAUTHORIZED_STATUS) {
            return AuthError::from(err);
        }
        if self.store.clear_if_current(ticket) {
            warn!("token rejected by server, session cleared");
            AuthError::from(err)
        } else {
            AuthError::Superseded
        }
    }

    async fn bounded<T, F>(&self, call: F) -> std::result::Result<T, BackendError>
    where
        F: Future<Output = std::result::Result<T, BackendError>>,
    {
        tokio::time::timeout(self.timeout, call)
            .await
            .unwrap_or(Err(BackendError::Timeout))
    }
}

/// Builds a session from a login/register response.
fn session_from(response: AuthResponse) -> std::result::Result<Session, AuthError> {
    let token = token_from(response.access_token)?;
    let payload = response.user.ok_or_else(|| AuthError::Authentication {
        status: None,
        message: "response did not include a user".to_string(),
    })?;
    Ok(Session::new(token, identity_from(payload)?))
}

fn token_from(token: Option<String>) -> std::result::Result<BearerToken, AuthError> {
    token
        .map(BearerToken::new)
        .filter(|token| !token.is_blank())
        .ok_or_else(|| AuthError::Authentication {
            status: None,
            message: "response did not include an access token".to_string(),
        })
}

fn identity_from(payload: serde_json::Value) -> std::result::Result<Identity, AuthError> {
    Identity::from_value(payload).map_err(|e| AuthError::Authentication {
        status: None,
        message: format!("malformed user payload: {e}"),
    })
}
