use chrono::NaiveDate;

use orgdir_auth::Role;
use orgdir_core::{DomainError, DomainResult, Entity, OrganizationId, UserId};

use crate::{NAME_MAX_LEN, PHONE_MAX_LEN};

/// A directory user.
///
/// `email` is stored normalized (see [`normalize_email`]) and is globally
/// unique. `password_hash` is an opaque PHC string; this type deliberately
/// does not implement `Serialize`, responses are built field by field.
#[derive(Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub birthdate: NaiveDate,
    pub organization_id: OrganizationId,
    pub role: Role,
    pub password_hash: String,
}

impl core::fmt::Debug for User {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("email", &self.email)
            .field("phone", &self.phone)
            .field("birthdate", &self.birthdate)
            .field("organization_id", &self.organization_id)
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}

impl Entity for User {
    type Id = UserId;

    fn id(&self) -> UserId {
        self.id
    }
}

/// Canonical form of an email address: trimmed and lower-cased.
pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Raw create payload, as received from a client.
///
/// Everything is optional so that missing fields surface as validation
/// errors naming the field rather than as deserialization failures.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewUser {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub birthdate: Option<String>,
    pub organization_id: Option<String>,
    pub role: Option<String>,
    pub password: Option<String>,
}

/// A create payload that passed validation. Holds the plaintext password
/// until the caller hashes it via [`UserDraft::into_user`].
#[derive(Clone, PartialEq, Eq)]
pub struct UserDraft {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub birthdate: NaiveDate,
    pub organization_id: OrganizationId,
    pub role: Role,
    pub password: String,
}

impl core::fmt::Debug for UserDraft {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("UserDraft")
            .field("email", &self.email)
            .field("organization_id", &self.organization_id)
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}

impl NewUser {
    /// The normalized email, if one was supplied.
    pub fn normalized_email(&self) -> Option<String> {
        self.email.as_deref().map(normalize_email)
    }

    /// Validate every field. `role` defaults to `USER` when absent.
    pub fn validate(self) -> DomainResult<UserDraft> {
        let name = parse_name(required("name", self.name)?)?;
        let email = parse_email(&required("email", self.email)?)?;
        let phone = parse_phone(required("phone", self.phone)?)?;
        let birthdate = parse_birthdate(&required("birthdate", self.birthdate)?)?;
        let organization_id = parse_organization(&required("organization", self.organization_id)?)?;
        let role = match self.role {
            Some(raw) => parse_role(&raw)?,
            None => Role::User,
        };
        let password = required("password", self.password)?;
        if password.is_empty() {
            return Err(DomainError::validation("password: this field may not be blank"));
        }

        Ok(UserDraft {
            name,
            email,
            phone,
            birthdate,
            organization_id,
            role,
            password,
        })
    }
}

impl UserDraft {
    pub fn into_user(self, id: UserId, password_hash: String) -> User {
        User {
            id,
            name: self.name,
            email: self.email,
            phone: self.phone,
            birthdate: self.birthdate,
            organization_id: self.organization_id,
            role: self.role,
            password_hash,
        }
    }
}

/// Partial update of a user; `None` leaves the field untouched.
///
/// Passwords are not part of the patch: the service hashes a new password
/// separately and hands the hash to [`UserPatch::apply_to`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub birthdate: Option<String>,
    pub organization_id: Option<String>,
    pub role: Option<String>,
}

impl UserPatch {
    /// Apply onto `user`, validating each supplied field.
    pub fn apply_to(self, user: &User, password_hash: Option<String>) -> DomainResult<User> {
        let mut next = user.clone();
        if let Some(name) = self.name {
            next.name = parse_name(name)?;
        }
        if let Some(email) = self.email {
            next.email = parse_email(&email)?;
        }
        if let Some(phone) = self.phone {
            next.phone = parse_phone(phone)?;
        }
        if let Some(birthdate) = self.birthdate {
            next.birthdate = parse_birthdate(&birthdate)?;
        }
        if let Some(org) = self.organization_id {
            next.organization_id = parse_organization(&org)?;
        }
        if let Some(role) = self.role {
            next.role = parse_role(&role)?;
        }
        if let Some(hash) = password_hash {
            next.password_hash = hash;
        }
        Ok(next)
    }
}

fn required(field: &str, value: Option<String>) -> DomainResult<String> {
    value.ok_or_else(|| DomainError::validation(format!("{field}: this field is required")))
}

fn parse_name(raw: String) -> DomainResult<String> {
    let name = raw.trim().to_string();
    if name.is_empty() {
        return Err(DomainError::validation("name: this field may not be blank"));
    }
    if name.chars().count() > NAME_MAX_LEN {
        return Err(DomainError::validation(format!(
            "name: ensure this field has no more than {NAME_MAX_LEN} characters"
        )));
    }
    Ok(name)
}

fn parse_email(raw: &str) -> DomainResult<String> {
    let email = normalize_email(raw);
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if !valid || email.chars().count() > NAME_MAX_LEN {
        return Err(DomainError::validation("email: enter a valid email address"));
    }
    Ok(email)
}

fn parse_phone(raw: String) -> DomainResult<String> {
    let phone = raw.trim().to_string();
    if phone.chars().count() > PHONE_MAX_LEN {
        return Err(DomainError::validation(format!(
            "phone: ensure this field has no more than {PHONE_MAX_LEN} characters"
        )));
    }
    Ok(phone)
}

fn parse_birthdate(raw: &str) -> DomainResult<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| DomainError::validation("birthdate: date has wrong format, use YYYY-MM-DD"))
}

fn parse_organization(raw: &str) -> DomainResult<OrganizationId> {
    raw.parse::<OrganizationId>()
        .map_err(|_| DomainError::validation(format!("organization: '{}' is not a valid id", raw.trim())))
}

fn parse_role(raw: &str) -> DomainResult<Role> {
    raw.parse::<Role>()
        .map_err(|e| DomainError::validation(format!("role: {e}")))
}
