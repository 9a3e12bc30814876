//! Authentication state and role-based access for roadfleet clients.
//!
//! This crate provides:
//! - The role hierarchy (`Role`, `RoleFlags`, `rank`, `satisfies`)
//! - Identities as issued by the backend (`Identity`, `UserStatus`)
//! - The session store that persists and publishes the current session
//!   (`SessionStore`, `SessionStorage`, `AuthSnapshot`)
//! - The auth gateway that exchanges credentials with the backend
//!   (`AuthGateway`, `AuthBackend`)
//! - The access guard that decides whether protected content may render
//!   (`AccessGuard`, `GuardState`)
//!
//! # Access Control Model
//!
//! Roles are totally ordered: `worker` < `company_admin` < `super_admin`.
//! A guard requiring a role admits every role ranked at least as high.
//! Unknown role strings rank as `worker`.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use roadfleet_access::{AccessGuard, GuardState, MemoryStorage, Role, SessionStore};
//!
//! let store = SessionStore::new(Arc::new(MemoryStorage::new()));
//! let guard = AccessGuard::new(Role::CompanyAdmin);
//!
//! // Nothing is decided until persisted state has been read.
//! assert_eq!(guard.evaluate(&store.current()), GuardState::Loading);
//!
//! store.load();
//! assert_eq!(guard.evaluate(&store.current()), GuardState::Unauthenticated);
//!
//! assert!(Role::SuperAdmin.satisfies(Role::CompanyAdmin));
//! assert!(!roadfleet_access::satisfies("mechanic", "company_admin"));
//! ```

pub mod backend;
pub mod error;
pub mod gateway;
pub mod guard;
pub mod identity;
pub mod role;
pub mod session;
pub mod storage;
pub mod store;

// Re-export main types at crate root
pub use backend::{AuthBackend, AuthResponse, Credentials, Registration, TokenResponse};
pub use error::{AuthError, BackendError, SessionCorruptionError};
pub use gateway::AuthGateway;
pub use guard::{AccessGuard, DEFAULT_LOGIN_PATH, GuardAction, GuardState};
pub use identity::{Identity, UserStatus};
pub use role::{ParseRoleError, Role, RoleFlags, rank, satisfies};
pub use session::{BearerToken, Session};
pub use storage::{FileStorage, MemoryStorage, SessionStorage, StorageError};
pub use store::{AttemptTicket, AuthSnapshot, SessionStore};
