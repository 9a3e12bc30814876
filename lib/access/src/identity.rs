//! Identity domain type.
//!
//! An `Identity` is the backend's description of an authenticated actor.
//! The client never edits one: role and company are assigned server-side,
//! so an identity is only ever replaced whole after a server round trip.
//!
//! Deserializing an `Identity` is the single place where wire and persisted
//! user payloads are normalized. Both the gateway and the session store go
//! through [`Identity::from_json`] / [`Identity::from_value`], so the
//! "missing role means worker" rule cannot drift between call sites.

use chrono::{DateTime, Utc};
use roadfleet_core::{CompanyId, UserId};
use serde::{Deserialize, Serialize};

use crate::role::{Role, RoleFlags};

/// Account status as reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    /// Account may sign in.
    #[default]
    Active,
    /// Account was deactivated by an administrator.
    Inactive,
    /// Account is temporarily blocked.
    Suspended,
    /// Invitation sent but not yet accepted.
    Pending,
}

impl UserStatus {
    /// Returns true if the account is active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }
}

/// An authenticated actor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    id: UserId,
    email: String,
    name: String,
    /// Legacy payloads omit the role; they get the least privileged one.
    #[serde(default)]
    role: Role,
    /// Absent for platform-level accounts that belong to no company.
    #[serde(default)]
    company_id: Option<CompanyId>,
    #[serde(default)]
    status: UserStatus,
    #[serde(with = "timestamp")]
    created_at: DateTime<Utc>,
    #[serde(
        default,
        with = "timestamp::option",
        skip_serializing_if = "Option::is_none"
    )]
    last_login: Option<DateTime<Utc>>,
}

impl Identity {
    /// Creates an identity with all fields specified.
    ///
    /// Use this for fixtures and when reconstituting from a trusted source;
    /// payloads from the network go through [`Identity::from_value`].
    #[must_use]
    #[expect(clippy::too_many_arguments)]
    pub fn with_all_fields(
        id: UserId,
        email: String,
        name: String,
        role: Role,
        company_id: Option<CompanyId>,
        status: UserStatus,
        created_at: DateTime<Utc>,
        last_login: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id,
            email,
            name,
            role,
            company_id,
            status,
            created_at,
            last_login,
        }
    }

    /// Parses a JSON user payload.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload is not a well-formed identity.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// Parses an already-decoded JSON user payload.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload is not a well-formed identity.
    pub fn from_value(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    /// Serializes the identity in the persisted layout.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Returns the user's ID.
    #[must_use]
    pub fn id(&self) -> &UserId {
        &self.id
    }

    /// Returns the user's email address.
    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Returns the display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the assigned role.
    #[must_use]
    pub fn role(&self) -> Role {
        self.role
    }

    /// Returns the role checks derived from the assigned role.
    #[must_use]
    pub fn flags(&self) -> RoleFlags {
        RoleFlags::for_role(self.role)
    }

    /// Returns the owning company, if any.
    #[must_use]
    pub fn company_id(&self) -> Option<&CompanyId> {
        self.company_id.as_ref()
    }

    /// Returns the account status.
    #[must_use]
    pub fn status(&self) -> UserStatus {
        self.status
    }

    /// Returns when the account was created.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns when the user last signed in, if ever.
    #[must_use]
    pub fn last_login(&self) -> Option<DateTime<Utc>> {
        self.last_login
    }
}

/// Timestamp encoding for identity payloads.
///
/// The backend writes naive ISO-8601 strings (no offset); those are read as
/// UTC. Values are always written as RFC 3339.
mod timestamp {
    use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer, de};

    const NAIVE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

    pub fn parse(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
        DateTime::parse_from_rfc3339(raw)
            .map(|dt| dt.with_timezone(&Utc))
            .or_else(|_| NaiveDateTime::parse_from_str(raw, NAIVE_FORMAT).map(|n| n.and_utc()))
    }

    fn format(value: &DateTime<Utc>) -> String {
        value.to_rfc3339_opts(SecondsFormat::AutoSi, true)
    }

    pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format(value))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).map_err(de::Error::custom)
    }

    pub mod option {
        use super::*;

        pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            match value {
                Some(value) => serializer.serialize_some(&format(value)),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
        where
            D: Deserializer<'de>,
        {
            Option::<String>::deserialize(deserializer)?
                .map(|raw| parse(&raw).map_err(de::Error::custom))
                .transpose()
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    pub(crate) fn identity(role: Role) -> Identity {
        Identity::with_all_fields(
            "1".parse().expect("id"),
            "a@b.com".to_string(),
            "A".to_string(),
            role,
            Some("fleet-co".parse().expect("company")),
            UserStatus::Active,
            Utc.with_ymd_and_hms(2024, 3, 1, 8, 30, 0).single().expect("timestamp"),
            None,
        )
    }

    #[test]
    fn parses_backend_payload() {
        let parsed = Identity::from_value(json!({
            "id": "1",
            "email": "a@b.com",
            "name": "A",
            "role": "company_admin",
            "company_id": "c-9",
            "status": "active",
            "created_at": "2024-03-01T08:30:00.123456",
            "last_login": null
        }))
        .expect("parse");

        assert_eq!(parsed.id().as_str(), "1");
        assert_eq!(parsed.role(), Role::CompanyAdmin);
        assert_eq!(parsed.company_id().map(CompanyId::as_str), Some("c-9"));
        assert_eq!(parsed.status(), UserStatus::Active);
        assert_eq!(parsed.created_at().timestamp_subsec_micros(), 123_456);
        assert!(parsed.last_login().is_none());
    }

    #[test]
    fn missing_role_defaults_to_worker() {
        let parsed = Identity::from_json(
            r#"{"id":"7","email":"w@b.com","name":"W","created_at":"2024-01-01T00:00:00Z"}"#,
        )
        .expect("parse");
        assert_eq!(parsed.role(), Role::Worker);
        assert_eq!(parsed.status(), UserStatus::Active);
        assert!(parsed.company_id().is_none());
    }

    #[test]
    fn unknown_role_defaults_to_worker() {
        let parsed = Identity::from_value(json!({
            "id": "7",
            "email": "w@b.com",
            "name": "W",
            "role": "user",
            "created_at": "2024-01-01T00:00:00Z"
        }))
        .expect("parse");
        assert_eq!(parsed.role(), Role::Worker);
        assert!(!parsed.flags().is_company_admin);
    }

    #[test]
    fn rejects_malformed_payloads() {
        assert!(Identity::from_json("not json").is_err());
        assert!(Identity::from_json(r#"{"email":"x@y.com"}"#).is_err());
        assert!(
            Identity::from_value(json!({
                "id": "",
                "email": "x@y.com",
                "name": "X",
                "created_at": "2024-01-01T00:00:00Z"
            }))
            .is_err()
        );
        assert!(
            Identity::from_value(json!({
                "id": "1",
                "email": "x@y.com",
                "name": "X",
                "created_at": "yesterday"
            }))
            .is_err()
        );
    }

    #[test]
    fn persisted_layout_roundtrip() {
        let original = Identity::with_all_fields(
            "u-1".parse().expect("id"),
            "x@y.com".to_string(),
            "X".to_string(),
            Role::SuperAdmin,
            None,
            UserStatus::Pending,
            Utc::now(),
            Some(Utc::now()),
        );

        let json = original.to_json().expect("serialize");
        let value: serde_json::Value = serde_json::from_str(&json).expect("json");
        assert_eq!(value["role"], "super_admin");
        assert_eq!(value["status"], "pending");
        assert!(value["company_id"].is_null());

        assert_eq!(Identity::from_json(&json).expect("parse"), original);
    }

    #[test]
    fn last_login_is_omitted_when_absent() {
        let json = identity(Role::Worker).to_json().expect("serialize");
        assert!(!json.contains("last_login"));
    }
}
