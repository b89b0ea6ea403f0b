use std::collections::{BTreeMap, BTreeSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use orgdir_core::{Entity, OrganizationId, UserId};
use orgdir_directory::{Group, Organization, User};

use super::{DirectoryStore, StoreError, UserQuery};

#[derive(Debug, Default)]
struct Tables {
    organizations: BTreeMap<OrganizationId, Organization>,
    users: BTreeMap<UserId, User>,
    /// Ordered as seeded; group names are unique.
    groups: Vec<Group>,
    memberships: BTreeMap<UserId, BTreeSet<String>>,
}

impl Tables {
    fn email_taken_by_other(&self, email: &str, id: UserId) -> bool {
        self.users.values().any(|u| u.email == email && u.id != id)
    }

    fn check_organization(&self, org: OrganizationId) -> Result<(), StoreError> {
        if self.organizations.contains_key(&org) {
            Ok(())
        } else {
            Err(StoreError::UnknownOrganization(org))
        }
    }
}

/// Add a record under a fresh id; ids are never reused.
fn insert_new<E: Entity + Clone>(table: &mut BTreeMap<E::Id, E>, record: E) -> Result<E, StoreError> {
    let id = record.id();
    if table.contains_key(&id) {
        return Err(StoreError::Storage(format!("record {id:?} already exists")));
    }
    table.insert(id, record.clone());
    Ok(record)
}

fn replace_existing<E: Entity + Clone>(table: &mut BTreeMap<E::Id, E>, record: E) -> Result<E, StoreError> {
    let slot = table.get_mut(&record.id()).ok_or(StoreError::NotFound)?;
    *slot = record.clone();
    Ok(record)
}

/// In-memory directory store for tests/dev.
///
/// Every write runs under a single write lock, so uniqueness and foreign key
/// checks are atomic with the write.
#[derive(Debug)]
pub struct InMemoryDirectoryStore {
    inner: RwLock<Tables>,
}

impl InMemoryDirectoryStore {
    /// Empty store seeded with the default role groups.
    pub fn new() -> Self {
        Self::with_groups(Group::defaults())
    }

    /// Empty store with no role groups, so every group link fails.
    pub fn without_groups() -> Self {
        Self::with_groups(Vec::new())
    }

    fn with_groups(groups: Vec<Group>) -> Self {
        Self {
            inner: RwLock::new(Tables {
                groups,
                ..Tables::default()
            }),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, StoreError> {
        self.inner
            .read()
            .map_err(|_| StoreError::Storage("directory lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, StoreError> {
        self.inner
            .write()
            .map_err(|_| StoreError::Storage("directory lock poisoned".into()))
    }
}

impl Default for InMemoryDirectoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DirectoryStore for InMemoryDirectoryStore {
    async fn get_user(&self, id: UserId) -> Result<Option<User>, StoreError> {
        Ok(self.read()?.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self.read()?.users.values().find(|u| u.email == email).cloned())
    }

    async fn list_users(&self, query: &UserQuery) -> Result<Vec<User>, StoreError> {
        Ok(self
            .read()?
            .users
            .values()
            .filter(|u| query.matches(u))
            .cloned()
            .collect())
    }

    async fn insert_user(&self, user: User) -> Result<User, StoreError> {
        let mut tables = self.write()?;
        if tables.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::DuplicateEmail);
        }
        tables.check_organization(user.organization_id)?;
        insert_new(&mut tables.users, user)
    }

    async fn update_user(&self, user: User) -> Result<User, StoreError> {
        let mut tables = self.write()?;
        if !tables.users.contains_key(&user.id) {
            return Err(StoreError::NotFound);
        }
        if tables.email_taken_by_other(&user.email, user.id) {
            return Err(StoreError::DuplicateEmail);
        }
        tables.check_organization(user.organization_id)?;
        replace_existing(&mut tables.users, user)
    }

    async fn delete_user(&self, id: UserId) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        tables.users.remove(&id).ok_or(StoreError::NotFound)?;
        tables.memberships.remove(&id);
        Ok(())
    }

    async fn link_group(&self, user: UserId, group: &str) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        if !tables.groups.iter().any(|g| g.name == group) {
            return Err(StoreError::UnknownGroup(group.to_string()));
        }
        if !tables.users.contains_key(&user) {
            return Err(StoreError::NotFound);
        }
        tables.memberships.entry(user).or_default().insert(group.to_string());
        Ok(())
    }

    async fn user_groups(&self, user: UserId) -> Result<Vec<Group>, StoreError> {
        let tables = self.read()?;
        let Some(names) = tables.memberships.get(&user) else {
            return Ok(vec![]);
        };
        Ok(tables
            .groups
            .iter()
            .filter(|g| names.contains(&g.name))
            .cloned()
            .collect())
    }

    async fn list_groups(&self) -> Result<Vec<Group>, StoreError> {
        Ok(self.read()?.groups.clone())
    }

    async fn get_organization(&self, id: OrganizationId) -> Result<Option<Organization>, StoreError> {
        Ok(self.read()?.organizations.get(&id).cloned())
    }

    async fn list_organizations(&self) -> Result<Vec<Organization>, StoreError> {
        Ok(self.read()?.organizations.values().cloned().collect())
    }

    async fn insert_organization(&self, org: Organization) -> Result<Organization, StoreError> {
        insert_new(&mut self.write()?.organizations, org)
    }

    async fn update_organization(&self, org: Organization) -> Result<Organization, StoreError> {
        replace_existing(&mut self.write()?.organizations, org)
    }

    async fn delete_organization(&self, id: OrganizationId) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        tables.organizations.remove(&id).ok_or(StoreError::NotFound)?;

        let members: Vec<UserId> = tables
            .users
            .values()
            .filter(|u| u.organization_id == id)
            .map(|u| u.id)
            .collect();
        for user in members {
            tables.users.remove(&user);
            tables.memberships.remove(&user);
        }
        Ok(())
    }
}
