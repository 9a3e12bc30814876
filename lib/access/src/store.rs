//! Session store: the single holder of "who is signed in".
//!
//! The store is an explicit object injected where needed (no global). It
//! keeps the current session in memory, mirrors it to [`SessionStorage`]
//! under the `token` and `user` keys, and publishes every change on a
//! `tokio::sync::watch` channel so views bound to the current user re-render.
//!
//! The store never fails. Unreadable or inconsistent persisted data is
//! logged, wiped, and treated as "signed out".
//!
//! # Attempt sequencing
//!
//! Sign-in calls are not cancelled when superseded. Instead each one takes an
//! [`AttemptTicket`] before going to the network and commits its result with
//! [`SessionStore::commit`]. A commit is applied only if no newer ticket was
//! issued and no `save`/`clear` happened in between, so a slow login cannot
//! resurrect a session the user already signed out of.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use tracing::{debug, warn};

use crate::error::SessionCorruptionError;
use crate::identity::Identity;
use crate::role::RoleFlags;
use crate::session::{BearerToken, Session};
use crate::storage::SessionStorage;

/// Storage key for the bearer token.
pub const TOKEN_KEY: &str = "token";
/// Storage key for the serialized identity.
pub const USER_KEY: &str = "user";

/// What observers of the store see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthSnapshot {
    /// Persisted state has not been read yet.
    Loading,
    /// No session.
    Anonymous,
    /// A session is active. `flags` are derived once when it is published.
    Authenticated {
        session: Arc<Session>,
        flags: RoleFlags,
    },
}

impl AuthSnapshot {
    fn authenticated(session: Session) -> Self {
        let flags = session.flags();
        Self::Authenticated {
            session: Arc::new(session),
            flags,
        }
    }

    /// Returns true while rehydration is pending.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    /// Returns the current session, if any.
    #[must_use]
    pub fn session(&self) -> Option<&Session> {
        match self {
            Self::Authenticated { session, .. } => Some(session),
            _ => None,
        }
    }

    /// Returns the role checks; all false without a session.
    #[must_use]
    pub fn flags(&self) -> RoleFlags {
        match self {
            Self::Authenticated { flags, .. } => *flags,
            _ => RoleFlags::default(),
        }
    }
}

/// Proof that a sign-in attempt was started at a given point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptTicket(u64);

/// Holds, persists and publishes the current session.
pub struct SessionStore {
    storage: Arc<dyn SessionStorage>,
    state: watch::Sender<AuthSnapshot>,
    /// Generation counter; bumped by every attempt start, save and clear.
    /// Holding the lock also serializes all mutations.
    generation: Mutex<u64>,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("state", &*self.state.borrow())
            .finish_non_exhaustive()
    }
}

impl SessionStore {
    /// Creates a store over `storage`. It starts in `Loading` until
    /// [`load`](Self::load) is called.
    #[must_use]
    pub fn new(storage: Arc<dyn SessionStorage>) -> Self {
        let (state, _) = watch::channel(AuthSnapshot::Loading);
        Self {
            storage,
            state,
            generation: Mutex::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, u64> {
        // The guarded value is a plain counter; a poisoned lock is still usable.
        self.generation
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Rehydrates the session from storage.
    ///
    /// Returns `None` and wipes both keys if only one of them is present or
    /// the stored identity does not parse.
    pub fn load(&self) -> Option<Session> {
        let _guard = self.lock();
        match self.read_persisted() {
            Ok(Some(session)) => {
                debug!(user_id = %session.identity().id(), "session rehydrated");
                self.state
                    .send_replace(AuthSnapshot::authenticated(session.clone()));
                Some(session)
            }
            Ok(None) => {
                debug!("no persisted session");
                self.state.send_replace(AuthSnapshot::Anonymous);
                None
            }
            Err(corruption) => {
                warn!(error = %corruption, "discarding persisted session");
                self.wipe();
                self.state.send_replace(AuthSnapshot::Anonymous);
                None
            }
        }
    }

    /// Persists `session` and makes it current.
    pub fn save(&self, session: Session) {
        let mut generation = self.lock();
        *generation += 1;
        self.apply(session);
    }

    /// Removes any session from memory and storage. Idempotent.
    pub fn clear(&self) {
        let mut generation = self.lock();
        *generation += 1;
        self.wipe();
        self.state.send_replace(AuthSnapshot::Anonymous);
        debug!("session cleared");
    }

    /// Starts a sign-in attempt; older outstanding attempts become stale.
    #[must_use]
    pub fn begin_attempt(&self) -> AttemptTicket {
        let mut generation = self.lock();
        *generation += 1;
        AttemptTicket(*generation)
    }

    /// Applies the result of the attempt identified by `ticket`.
    ///
    /// Returns false, leaving the store untouched, if anything changed the
    /// store since the ticket was issued.
    #[must_use]
    pub fn commit(&self, ticket: AttemptTicket, session: Session) -> bool {
        let generation = self.lock();
        if *generation != ticket.0 {
            debug!(
                ticket = ticket.0,
                current = *generation,
                "discarding stale sign-in result"
            );
            return false;
        }
        self.apply(session);
        true
    }

    /// Clears the session only if nothing changed the store since `ticket`
    /// was issued.
    ///
    /// Returns false, leaving the store untouched, for a stale ticket.
    #[must_use]
    pub fn clear_if_current(&self, ticket: AttemptTicket) -> bool {
        let mut generation = self.lock();
        if *generation != ticket.0 {
            debug!(
                ticket = ticket.0,
                current = *generation,
                "ignoring stale token rejection"
            );
            return false;
        }
        *generation += 1;
        self.wipe();
        self.state.send_replace(AuthSnapshot::Anonymous);
        debug!("session cleared after token rejection");
        true
    }

    /// Returns the latest snapshot.
    #[must_use]
    pub fn current(&self) -> AuthSnapshot {
        self.state.borrow().clone()
    }

    /// Returns the current session, if any.
    #[must_use]
    pub fn session(&self) -> Option<Session> {
        self.state.borrow().session().cloned()
    }

    /// Returns the current bearer token, if any.
    #[must_use]
    pub fn bearer_token(&self) -> Option<BearerToken> {
        self.state.borrow().session().map(|s| s.token().clone())
    }

    /// Subscribes to snapshot changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AuthSnapshot> {
        self.state.subscribe()
    }

    fn apply(&self, session: Session) {
        self.persist(&session);
        debug!(user_id = %session.identity().id(), role = %session.role(), "session saved");
        self.state.send_replace(AuthSnapshot::authenticated(session));
    }

    fn read_persisted(&self) -> Result<Option<Session>, SessionCorruptionError> {
        let unreadable = |e: crate::storage::StorageError| SessionCorruptionError::Unreadable {
            reason: e.to_string(),
        };
        let token = self.storage.get(TOKEN_KEY).map_err(unreadable)?;
        let user = self.storage.get(USER_KEY).map_err(unreadable)?;

        match (token, user) {
            (None, None) => Ok(None),
            (Some(_), None) => Err(SessionCorruptionError::MissingUser),
            (None, Some(_)) => Err(SessionCorruptionError::MissingToken),
            (Some(token), Some(user)) => {
                let token = BearerToken::new(token);
                if token.is_blank() {
                    return Err(SessionCorruptionError::EmptyToken);
                }
                let identity =
                    Identity::from_json(&user).map_err(|e| SessionCorruptionError::InvalidUser {
                        reason: e.to_string(),
                    })?;
                Ok(Some(Session::new(token, identity)))
            }
        }
    }

    /// Writes token then user. On failure both keys are removed so storage
    /// never holds half a session; memory still reflects the new session.
    fn persist(&self, session: &Session) {
        let result = session
            .identity()
            .to_json()
            .map_err(|e| e.to_string())
            .and_then(|user| {
                self.storage
                    .set(TOKEN_KEY, session.token().as_str())
                    .and_then(|()| self.storage.set(USER_KEY, &user))
                    .map_err(|e| e.to_string())
            });

        if let Err(reason) = result {
            warn!(error = %reason, "failed to persist session, it will not survive a restart");
            self.wipe();
        }
    }

    fn wipe(&self) {
        for key in [TOKEN_KEY, USER_KEY] {
            if let Err(e) = self.storage.remove(key) {
                warn!(key, error = %e, "failed to remove persisted session data");
            }
        }
    }
}
