//! Access guard for protected content.
//!
//! The guard never fails: every store snapshot maps to exactly one
//! [`GuardState`], and each state to one [`GuardAction`] for the view layer.

use std::fmt;

use tokio::sync::watch;
use tracing::debug;

use crate::role::Role;
use crate::store::AuthSnapshot;

/// Where unauthenticated visitors are sent unless configured otherwise.
pub const DEFAULT_LOGIN_PATH: &str = "/login";

/// Outcome of checking a snapshot against a required role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardState {
    /// Persisted state has not been read yet; no decision is made.
    Loading,
    /// Nobody is signed in.
    Unauthenticated,
    /// Signed in, but the role is below the requirement.
    Insufficient { actual: Role, required: Role },
    /// Signed in with a sufficient role.
    Sufficient,
}

/// What the view layer should do for a [`GuardState`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardAction {
    /// Show a neutral waiting indicator.
    ShowLoading,
    /// Navigate to the login entry point.
    Redirect { to: String },
    /// Show an "access restricted" notice in place of the content.
    ShowRestricted { actual: Role, required: Role },
    /// Render the protected content unmodified.
    Render,
}

impl fmt::Display for GuardAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ShowLoading => write!(f, "Loading..."),
            Self::Redirect { to } => write!(f, "redirect to {to}"),
            Self::ShowRestricted { actual, required } => write!(
                f,
                "Access restricted: requires {} (you are {})",
                required.label(),
                actual.label()
            ),
            Self::Render => write!(f, "access granted"),
        }
    }
}

/// Guards content behind a minimum role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessGuard {
    required: Role,
    login_path: String,
}

impl Default for AccessGuard {
    /// Any signed-in user passes.
    fn default() -> Self {
        Self::new(Role::Worker)
    }
}

impl AccessGuard {
    /// Creates a guard requiring at least `required`.
    #[must_use]
    pub fn new(required: Role) -> Self {
        Self {
            required,
            login_path: DEFAULT_LOGIN_PATH.to_string(),
        }
    }

    /// Sets the login entry point used for redirects.
    #[must_use]
    pub fn with_login_path(mut self, login_path: impl Into<String>) -> Self {
        self.login_path = login_path.into();
        self
    }

    /// Returns the minimum role this guard admits.
    #[must_use]
    pub fn required(&self) -> Role {
        self.required
    }

    /// Returns the login entry point used for redirects.
    #[must_use]
    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    /// Classifies a snapshot.
    #[must_use]
    pub fn evaluate(&self, snapshot: &AuthSnapshot) -> GuardState {
        match snapshot {
            AuthSnapshot::Loading => GuardState::Loading,
            AuthSnapshot::Anonymous => GuardState::Unauthenticated,
            AuthSnapshot::Authenticated { session, .. } => {
                let actual = session.role();
                if actual.satisfies(self.required) {
                    GuardState::Sufficient
                } else {
                    GuardState::Insufficient {
                        actual,
                        required: self.required,
                    }
                }
            }
        }
    }

    /// Maps a state to the view action.
    #[must_use]
    pub fn action(&self, state: GuardState) -> GuardAction {
        match state {
            GuardState::Loading => GuardAction::ShowLoading,
            GuardState::Unauthenticated => GuardAction::Redirect {
                to: self.login_path.clone(),
            },
            GuardState::Insufficient { actual, required } => {
                GuardAction::ShowRestricted { actual, required }
            }
            GuardState::Sufficient => GuardAction::Render,
        }
    }

    /// Evaluates a snapshot straight to the view action.
    #[must_use]
    pub fn decide(&self, snapshot: &AuthSnapshot) -> GuardAction {
        self.action(self.evaluate(snapshot))
    }

    /// Waits until the store has finished loading and returns the settled
    /// state.
    ///
    /// If the store is dropped while still loading, the visitor is treated as
    /// unauthenticated.
    pub async fn resolve(&self, receiver: &mut watch::Receiver<AuthSnapshot>) -> GuardState {
        match receiver.wait_for(|snapshot| !snapshot.is_loading()).await {
            Ok(snapshot) => {
                let state = self.evaluate(&snapshot);
                debug!(required = %self.required, ?state, "access guard settled");
                state
            }
            Err(_) => {
                debug!("session store closed while loading");
                GuardState::Unauthenticated
            }
        }
    }
}
