use core::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Role of a user account.
///
/// Roles are a flat, closed set: there is no hierarchy and no per-organization
/// override. The wire form is the upper-case tag (`"ADMIN"`, `"VIEWER"`,
/// `"USER"`); the display group name is what `/auth/groups` reports.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Admin,
    Viewer,
    User,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Admin, Role::Viewer, Role::User];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Viewer => "VIEWER",
            Role::User => "USER",
        }
    }

    /// Name of the role group a user of this role is linked to.
    pub fn group_name(&self) -> &'static str {
        match self {
            Role::Admin => "Administrator",
            Role::Viewer => "Viewer",
            Role::User => "User",
        }
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid role '{0}' (expected one of: ADMIN, VIEWER, USER)")]
pub struct InvalidRole(pub String);

impl FromStr for Role {
    type Err = InvalidRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "ADMIN" => Ok(Role::Admin),
            "VIEWER" => Ok(Role::Viewer),
            "USER" => Ok(Role::User),
            other => Err(InvalidRole(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_form_is_upper_case_tag() {
        assert_eq!(serde_json::to_string(&Role::Viewer).unwrap(), "\"VIEWER\"");
        let role: Role = serde_json::from_str("\"ADMIN\"").unwrap();
        assert_eq!(role, Role::Admin);
    }

    #[test]
    fn display_names_are_not_accepted_as_roles() {
        assert!("Administrator".parse::<Role>().is_err());
        assert!("admin".parse::<Role>().is_err());
        assert_eq!("USER".parse::<Role>().unwrap(), Role::User);
    }
}
