//! Authenticated caller identity.
//!
//! Credentials are verified outside the core; these types carry the
//! verified result.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::UserId;

/// Role attached to a user account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Client,
    Employee,
    Admin,
}

impl Role {
    /// Returns the persisted tag for this role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Client => "CLIENT",
            Role::Employee => "EMPLOYEE",
            Role::Admin => "ADMIN",
        }
    }

    /// Staff roles see every reservation rather than only their own.
    pub fn is_privileged(&self) -> bool {
        matches!(self, Role::Employee | Role::Admin)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a role tag is not `CLIENT`, `EMPLOYEE` or `ADMIN`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CLIENT" => Ok(Role::Client),
            "EMPLOYEE" => Ok(Role::Employee),
            "ADMIN" => Ok(Role::Admin),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

/// The `{id, email, role}` triple produced by the authentication verifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: UserId,
    pub email: String,
    pub role: Role,
}

impl Identity {
    pub fn new(id: UserId, email: impl Into<String>, role: Role) -> Self {
        Self {
            id,
            email: email.into(),
            role,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staff_roles_are_privileged() {
        assert!(Role::Admin.is_privileged());
        assert!(Role::Employee.is_privileged());
        assert!(!Role::Client.is_privileged());
    }

    #[test]
    fn role_tags_roundtrip() {
        for role in [Role::Client, Role::Employee, Role::Admin] {
            assert_eq!(role.as_str().parse::<Role>(), Ok(role));
        }
        assert_eq!(
            "SUPERUSER".parse::<Role>(),
            Err(UnknownRole("SUPERUSER".to_string()))
        );
    }

    #[test]
    fn identity_deserializes_from_token_payload() {
        let identity: Identity =
            serde_json::from_str(r#"{"id": 3, "email": "a@b.fr", "role": "EMPLOYEE"}"#).unwrap();
        assert_eq!(identity, Identity::new(UserId::new(3), "a@b.fr", Role::Employee));
    }
}
