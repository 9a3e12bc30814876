//! Error types for the access crate.
//!
//! - `AuthError`: what gateway callers see, wrapped in a rootcause `Report`
//! - `BackendError`: what an `AuthBackend` reports about one HTTP exchange
//! - `SessionCorruptionError`: why persisted session data was discarded
//!
//! Denied access is not an error. It is a guard state
//! (see [`GuardState::Insufficient`](crate::guard::GuardState::Insufficient)).

use std::fmt;

/// Errors surfaced by the auth gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Credentials rejected or the server failed the exchange.
    ///
    /// `status` is the HTTP status when the server answered at all.
    Authentication {
        status: Option<u16>,
        message: String,
    },
    /// The backend could not be reached or did not answer in time.
    Network { reason: String },
    /// A newer login/register attempt or a logout happened while this one
    /// was in flight; its result was discarded.
    Superseded,
    /// The operation needs a session and there is none.
    NotAuthenticated,
}

impl AuthError {
    /// Returns true if retrying with other credentials may help.
    #[must_use]
    pub fn is_credentials_problem(&self) -> bool {
        matches!(self, Self::Authentication { status: Some(400..=499), .. })
    }
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Authentication {
                status: Some(status),
                message,
            } => write!(f, "authentication failed ({status}): {message}"),
            Self::Authentication {
                status: None,
                message,
            } => write!(f, "authentication failed: {message}"),
            Self::Network { reason } => {
                write!(f, "could not reach the server, try again: {reason}")
            }
            Self::Superseded => write!(f, "superseded by a newer sign-in or sign-out"),
            Self::NotAuthenticated => write!(f, "not signed in"),
        }
    }
}

impl std::error::Error for AuthError {}

/// Errors from a single backend exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// The server answered with a non-success status.
    Rejected { status: u16, message: String },
    /// The request never completed (DNS, connect, TLS, reset).
    Transport { reason: String },
    /// No answer within the request timeout.
    Timeout,
    /// The server answered with success but an unusable body.
    InvalidResponse { reason: String },
}

impl BackendError {
    /// Returns the HTTP status if the server answered with one.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rejected { status, message } => write!(f, "HTTP {status}: {message}"),
            Self::Transport { reason } => write!(f, "transport failure: {reason}"),
            Self::Timeout => write!(f, "request timed out"),
            Self::InvalidResponse { reason } => write!(f, "invalid response: {reason}"),
        }
    }
}

impl std::error::Error for BackendError {}

impl From<BackendError> for AuthError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Rejected { status, message } => Self::Authentication {
                status: Some(status),
                message,
            },
            BackendError::Transport { reason } => Self::Network { reason },
            BackendError::Timeout => Self::Network {
                reason: "request timed out".to_string(),
            },
            BackendError::InvalidResponse { reason } => Self::Authentication {
                status: None,
                message: reason,
            },
        }
    }
}

/// Why persisted session data could not be rehydrated.
///
/// Never shown to users; the store logs it and starts signed out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCorruptionError {
    /// A token is stored without a user.
    MissingUser,
    /// A user is stored without a token.
    MissingToken,
    /// The stored token is blank.
    EmptyToken,
    /// The stored user does not parse as an identity.
    InvalidUser { reason: String },
    /// Storage could not be read.
    Unreadable { reason: String },
}

impl fmt::Display for SessionCorruptionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingUser => write!(f, "token present without a stored user"),
            Self::MissingToken => write!(f, "user present without a stored token"),
            Self::EmptyToken => write!(f, "stored token is empty"),
            Self::InvalidUser { reason } => write!(f, "stored user is malformed: {reason}"),
            Self::Unreadable { reason } => write!(f, "session storage unreadable: {reason}"),
        }
    }
}

impl std::error::Error for SessionCorruptionError {}
