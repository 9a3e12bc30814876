//! Session type: an identity paired with its bearer credential.
//!
//! A session exists only as a whole. The store never exposes a token
//! without a well-formed identity or the other way round.

use std::fmt;

use crate::identity::Identity;
use crate::role::{Role, RoleFlags};

/// Opaque bearer credential issued by the backend.
///
/// `Debug` output is redacted so sessions can be logged.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct BearerToken(String);

impl BearerToken {
    /// Wraps a token string.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the raw token for use in an `Authorization` header.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if the token has no content.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BearerToken(***)")
    }
}

impl From<String> for BearerToken {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for BearerToken {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// An authenticated session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    token: BearerToken,
    identity: Identity,
}

impl Session {
    /// Pairs a token with the identity it was issued for.
    #[must_use]
    pub fn new(token: BearerToken, identity: Identity) -> Self {
        Self { token, identity }
    }

    /// Returns the bearer token.
    #[must_use]
    pub fn token(&self) -> &BearerToken {
        &self.token
    }

    /// Returns the authenticated identity.
    #[must_use]
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Returns the identity's role.
    #[must_use]
    pub fn role(&self) -> Role {
        self.identity.role()
    }

    /// Returns the role checks for this session.
    #[must_use]
    pub fn flags(&self) -> RoleFlags {
        self.identity.flags()
    }

    /// Returns this session with the identity replaced by a fresh server copy.
    #[must_use]
    pub fn with_identity(self, identity: Identity) -> Self {
        Self {
            token: self.token,
            identity,
        }
    }

    /// Returns this session with a newly issued token.
    #[must_use]
    pub fn with_token(self, token: BearerToken) -> Self {
        Self {
            token,
            identity: self.identity,
        }
    }
}
