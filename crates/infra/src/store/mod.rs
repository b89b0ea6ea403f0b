//! Directory storage boundary.
//!
//! The API layer talks to a [`DirectoryStore`]; the in-memory implementation
//! backs tests and local development, the Postgres one is used when
//! `USE_PERSISTENT_STORES=true`.
//!
//! Stores enforce the relational invariants (unique email, organization
//! foreign key, cascade on organization delete). They never make
//! authorization decisions.

pub mod in_memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use orgdir_auth::Visibility;
use orgdir_core::{OrganizationId, UserId};
use orgdir_directory::{Group, Organization, User};

pub use in_memory::InMemoryDirectoryStore;
pub use postgres::PostgresDirectoryStore;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("User with this email already exists")]
    DuplicateEmail,

    #[error("organization {0} does not exist")]
    UnknownOrganization(OrganizationId),

    #[error("group '{0}' does not exist")]
    UnknownGroup(String),

    #[error("not found")]
    NotFound,

    #[error("storage error: {0}")]
    Storage(String),
}

/// Filter for [`DirectoryStore::list_users`]. All set fields must match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserQuery {
    pub organization_id: Option<OrganizationId>,
    pub user_id: Option<UserId>,
    /// Search terms, lowercased. Every term must appear in the name or the
    /// email (case-insensitive substring).
    pub search_terms: Vec<String>,
    /// Exact phone match.
    pub phone: Option<String>,
}

impl UserQuery {
    /// Restrict the query to what `visibility` admits.
    pub fn scoped(visibility: Visibility) -> Self {
        match visibility {
            Visibility::Organization(org) => Self::in_organization(org),
            Visibility::SelfOnly(id) => Self {
                user_id: Some(id),
                ..Self::default()
            },
        }
    }

    pub fn in_organization(org: OrganizationId) -> Self {
        Self {
            organization_id: Some(org),
            ..Self::default()
        }
    }

    /// Split `search` on whitespace and commas into terms.
    pub fn with_search(mut self, search: Option<String>) -> Self {
        self.search_terms = search
            .as_deref()
            .map(search_terms)
            .unwrap_or_default();
        self
    }

    pub fn with_phone(mut self, phone: Option<String>) -> Self {
        self.phone = phone.map(|p| p.trim().to_string()).filter(|p| !p.is_empty());
        self
    }

    pub fn matches(&self, user: &User) -> bool {
        if self.organization_id.is_some_and(|org| user.organization_id != org) {
            return false;
        }
        if self.user_id.is_some_and(|id| user.id != id) {
            return false;
        }
        if let Some(phone) = &self.phone {
            if &user.phone != phone {
                return false;
            }
        }
        let name = user.name.to_lowercase();
        let email = user.email.to_lowercase();
        self.search_terms
            .iter()
            .all(|term| name.contains(term.as_str()) || email.contains(term.as_str()))
    }
}

fn search_terms(raw: &str) -> Vec<String> {
    raw.split(|c: char| c.is_whitespace() || c == ',')
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Persistence for users, organizations and role groups.
///
/// Listing operations return records ordered by id, which for UUIDv7 ids is
/// creation order.
#[async_trait]
pub trait DirectoryStore: Send + Sync {
    async fn get_user(&self, id: UserId) -> Result<Option<User>, StoreError>;

    /// Look up by normalized email.
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn email_exists(&self, email: &str) -> Result<bool, StoreError> {
        Ok(self.find_user_by_email(email).await?.is_some())
    }

    async fn list_users(&self, query: &UserQuery) -> Result<Vec<User>, StoreError>;

    /// Fails with `DuplicateEmail` or `UnknownOrganization` without writing.
    async fn insert_user(&self, user: User) -> Result<User, StoreError>;

    /// Replace the stored record with the same id.
    async fn update_user(&self, user: User) -> Result<User, StoreError>;

    async fn delete_user(&self, id: UserId) -> Result<(), StoreError>;

    /// Add `user` to the named group. Linking twice is a no-op.
    async fn link_group(&self, user: UserId, group: &str) -> Result<(), StoreError>;

    async fn user_groups(&self, user: UserId) -> Result<Vec<Group>, StoreError>;

    async fn list_groups(&self) -> Result<Vec<Group>, StoreError>;

    async fn get_organization(&self, id: OrganizationId) -> Result<Option<Organization>, StoreError>;

    async fn list_organizations(&self) -> Result<Vec<Organization>, StoreError>;

    async fn insert_organization(&self, org: Organization) -> Result<Organization, StoreError>;

    async fn update_organization(&self, org: Organization) -> Result<Organization, StoreError>;

    /// Delete the organization and every user that belongs to it.
    async fn delete_organization(&self, id: OrganizationId) -> Result<(), StoreError>;
}

#[async_trait]
impl<S> DirectoryStore for Arc<S>
where
    S: DirectoryStore + ?Sized,
{
    async fn get_user(&self, id: UserId) -> Result<Option<User>, StoreError> {
        (**self).get_user(id).await
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        (**self).find_user_by_email(email).await
    }

    async fn email_exists(&self, email: &str) -> Result<bool, StoreError> {
        (**self).email_exists(email).await
    }

    async fn list_users(&self, query: &UserQuery) -> Result<Vec<User>, StoreError> {
        (**self).list_users(query).await
    }

    async fn insert_user(&self, user: User) -> Result<User, StoreError> {
        (**self).insert_user(user).await
    }

    async fn update_user(&self, user: User) -> Result<User, StoreError> {
        (**self).update_user(user).await
    }

    async fn delete_user(&self, id: UserId) -> Result<(), StoreError> {
        (**self).delete_user(id).await
    }

    async fn link_group(&self, user: UserId, group: &str) -> Result<(), StoreError> {
        (**self).link_group(user, group).await
    }

    async fn user_groups(&self, user: UserId) -> Result<Vec<Group>, StoreError> {
        (**self).user_groups(user).await
    }

    async fn list_groups(&self) -> Result<Vec<Group>, StoreError> {
        (**self).list_groups().await
    }

    async fn get_organization(&self, id: OrganizationId) -> Result<Option<Organization>, StoreError> {
        (**self).get_organization(id).await
    }

    async fn list_organizations(&self) -> Result<Vec<Organization>, StoreError> {
        (**self).list_organizations().await
    }

    async fn insert_organization(&self, org: Organization) -> Result<Organization, StoreError> {
        (**self).insert_organization(org).await
    }

    async fn update_organization(&self, org: Organization) -> Result<Organization, StoreError> {
        (**self).update_organization(org).await
    }

    async fn delete_organization(&self, id: OrganizationId) -> Result<(), StoreError> {
        (**self).delete_organization(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use orgdir_auth::Role;

    fn ada() -> User {
        User {
            id: UserId::new(),
            name: "Ada Lovelace".into(),
            email: "countess@test.com".into(),
            phone: "555".into(),
            birthdate: NaiveDate::from_ymd_opt(1815, 12, 10).unwrap(),
            organization_id: OrganizationId::new(),
            role: Role::User,
            password_hash: String::new(),
        }
    }

    #[test]
    fn search_splits_on_whitespace_and_commas() {
        let query = UserQuery::default().with_search(Some("  Ada,LOVELACE   test ".into()));
        assert_eq!(query.search_terms, ["ada", "lovelace", "test"]);
        assert!(UserQuery::default().with_search(Some(" , ".into())).search_terms.is_empty());
    }

    #[test]
    fn every_term_must_match_name_or_email() {
        let user = ada();
        let matches = |search: &str| UserQuery::default().with_search(Some(search.into())).matches(&user);

        assert!(matches("ada countess"));
        assert!(matches("lovelace"));
        assert!(!matches("ada babbage"));
        assert!(!matches("ada lovelace countess@elsewhere"));
        assert!(matches(""));
    }
}
