use serde::Deserialize;
use serde_json::{Value, json};

use orgdir_directory::{Group, NewOrganization, NewUser, Organization, OrganizationPatch, User, UserPatch};

use crate::app::services::UserRecord;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct UserListQuery {
    pub search: Option<String>,
    pub phone: Option<String>,
}

/// Body of `POST /users`. `organization` and `role` also accept the
/// `organization_id` and `user_type` spellings.
#[derive(Debug, Default, Deserialize)]
pub struct CreateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub birthdate: Option<String>,
    #[serde(alias = "organization_id")]
    pub organization: Option<String>,
    #[serde(alias = "user_type")]
    pub role: Option<String>,
    pub password: Option<String>,
}

impl From<CreateUserRequest> for NewUser {
    fn from(req: CreateUserRequest) -> Self {
        NewUser {
            name: req.name,
            email: req.email,
            phone: req.phone,
            birthdate: req.birthdate,
            organization_id: req.organization,
            role: req.role,
            password: req.password,
        }
    }
}

/// Body of `PATCH /users/{id}`; absent fields are left unchanged.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub birthdate: Option<String>,
    #[serde(alias = "organization_id")]
    pub organization: Option<String>,
    #[serde(alias = "user_type")]
    pub role: Option<String>,
    pub password: Option<String>,
}

impl UpdateUserRequest {
    /// Split off the password, which is hashed separately from the patch.
    pub fn into_parts(self) -> (UserPatch, Option<String>) {
        let patch = UserPatch {
            name: self.name,
            email: self.email,
            phone: self.phone,
            birthdate: self.birthdate,
            organization_id: self.organization,
            role: self.role,
        };
        (patch, self.password)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct OrganizationRequest {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

impl From<OrganizationRequest> for NewOrganization {
    fn from(req: OrganizationRequest) -> Self {
        NewOrganization {
            name: req.name,
            phone: req.phone,
            address: req.address,
        }
    }
}

impl From<OrganizationRequest> for OrganizationPatch {
    fn from(req: OrganizationRequest) -> Self {
        OrganizationPatch {
            name: req.name,
            phone: req.phone,
            address: req.address,
        }
    }
}

// -------------------------
// Response mapping
// -------------------------

/// Full user view. The password hash is never part of it.
pub fn user_to_json(record: UserRecord) -> Value {
    let user = record.user;
    json!({
        "id": user.id.to_string(),
        "name": user.name,
        "email": user.email,
        "phone": user.phone,
        "birthdate": user.birthdate.format("%Y-%m-%d").to_string(),
        "organization": user.organization_id.to_string(),
        "organization_name": record.organization_name,
        "role": user.role.as_str(),
    })
}

pub fn minimal_user_to_json(user: User) -> Value {
    json!({
        "id": user.id.to_string(),
        "name": user.name,
    })
}

pub fn organization_to_json(org: Organization) -> Value {
    json!({
        "id": org.id.to_string(),
        "name": org.name,
        "phone": org.phone,
        "address": org.address,
    })
}

pub fn group_to_json(group: Group) -> Value {
    json!({ "name": group.name })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use orgdir_auth::Role;
    use orgdir_core::{OrganizationId, UserId};

    #[test]
    fn user_json_has_no_credential_field() {
        let record = UserRecord {
            user: User {
                id: UserId::new(),
                name: "Ada".into(),
                email: "ada@test.com".into(),
                phone: "555".into(),
                birthdate: NaiveDate::from_ymd_opt(1990, 1, 1).unwrap(),
                organization_id: OrganizationId::new(),
                role: Role::Admin,
                password_hash: "$argon2id$secret".into(),
            },
            organization_name: "Acme".into(),
        };

        let value = user_to_json(record);
        assert_eq!(value["birthdate"], "1990-01-01");
        assert_eq!(value["role"], "ADMIN");
        assert_eq!(value["organization_name"], "Acme");
        assert!(value.get("password").is_none());
        assert!(!value.to_string().contains("argon2"));
    }

    #[test]
    fn legacy_field_spellings_are_accepted() {
        let req: CreateUserRequest = serde_json::from_value(json!({
            "user_type": "VIEWER",
            "organization_id": "x",
        }))
        .unwrap();
        assert_eq!(req.role.as_deref(), Some("VIEWER"));
        assert_eq!(req.organization.as_deref(), Some("x"));
    }

    #[test]
    fn update_request_splits_password_from_patch() {
        let req: UpdateUserRequest = serde_json::from_value(json!({
            "name": "Y",
            "password": "new",
        }))
        .unwrap();
        let (patch, password) = req.into_parts();
        assert_eq!(patch.name.as_deref(), Some("Y"));
        assert_eq!(password.as_deref(), Some("new"));
    }
}
