//! Role hierarchy for fleet access control.
//!
//! Roles form a strict total order. Every permission check in the client
//! reduces to "is the actual role ranked at least as high as the required
//! one", so a single integer rank is the whole policy.

use serde::{Deserialize, Deserializer, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Access role assigned to an identity by the backend.
///
/// - `Worker`: operates vehicles and records fuel/maintenance for one company
/// - `CompanyAdmin`: manages users and fleet data of one company
/// - `SuperAdmin`: manages companies across the platform
///
/// Deserialization is lenient: a missing, null or unrecognized role becomes
/// `Worker`. Unknown data can therefore never grant more than the least
/// privileged level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Least privileged role.
    #[default]
    Worker,
    /// Administrator of a single company.
    CompanyAdmin,
    /// Platform-wide administrator.
    SuperAdmin,
}

impl Role {
    /// All roles, lowest rank first.
    pub const ALL: [Role; 3] = [Role::Worker, Role::CompanyAdmin, Role::SuperAdmin];

    /// Returns the rank of this role in the hierarchy (1 = least privileged).
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::Worker => 1,
            Self::CompanyAdmin => 2,
            Self::SuperAdmin => 3,
        }
    }

    /// Returns true if this role is at least as privileged as `required`.
    #[must_use]
    pub const fn satisfies(self, required: Role) -> bool {
        self.rank() >= required.rank()
    }

    /// Returns the wire name of the role.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Worker => "worker",
            Self::CompanyAdmin => "company_admin",
            Self::SuperAdmin => "super_admin",
        }
    }

    /// Returns the label shown to people for this role.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Worker => "Operador",
            Self::CompanyAdmin => "Administrador",
            Self::SuperAdmin => "Super Admin",
        }
    }

    /// Parses a role as received from the backend or persisted storage.
    ///
    /// Unrecognized values resolve to `Worker` instead of failing.
    #[must_use]
    pub fn from_wire(value: &str) -> Self {
        value.parse().unwrap_or_else(|_| {
            tracing::debug!(role = value, "unrecognized role, treating as worker");
            Self::Worker
        })
    }
}

impl PartialOrd for Role {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Role {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank().cmp(&other.rank())
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned by the strict `FromStr` parse of a role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseRoleError {
    /// The rejected input.
    pub value: String,
}

impl fmt::Display for ParseRoleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown role '{}', expected one of worker, company_admin, super_admin",
            self.value
        )
    }
}

impl std::error::Error for ParseRoleError {}

impl FromStr for Role {
    type Err = ParseRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "worker" => Ok(Self::Worker),
            "company_admin" => Ok(Self::CompanyAdmin),
            "super_admin" => Ok(Self::SuperAdmin),
            other => Err(ParseRoleError {
                value: other.to_string(),
            }),
        }
    }
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<String>::deserialize(deserializer)?;
        Ok(value.as_deref().map(Role::from_wire).unwrap_or_default())
    }
}

/// Rank of a raw role string; anything unrecognized ranks as `worker`.
#[must_use]
pub fn rank(role: &str) -> u8 {
    Role::from_wire(role).rank()
}

/// Returns true if the raw `actual` role is at least as privileged as `required`.
#[must_use]
pub fn satisfies(actual: &str, required: &str) -> bool {
    rank(actual) >= rank(required)
}

/// Role checks derived once from a session's role.
///
/// Screens read these flags instead of re-deriving their own booleans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RoleFlags {
    /// The identity may manage companies.
    pub is_super_admin: bool,
    /// The identity may administer its company.
    pub is_company_admin: bool,
    /// The identity has at least worker access.
    pub is_worker: bool,
}

impl RoleFlags {
    /// Derives the flags for `role`.
    #[must_use]
    pub const fn for_role(role: Role) -> Self {
        Self {
            is_super_admin: role.satisfies(Role::SuperAdmin),
            is_company_admin: role.satisfies(Role::CompanyAdmin),
            is_worker: role.satisfies(Role::Worker),
        }
    }
}

impl From<Role> for RoleFlags {
    fn from(role: Role) -> Self {
        Self::for_role(role)
    }
}
