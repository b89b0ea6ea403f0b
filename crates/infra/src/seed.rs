//! Demo data: two organizations with two accounts per role in each.

use chrono::NaiveDate;
use thiserror::Error;
use tracing::info;

use orgdir_auth::{AuthError, PasswordHasher, Role};
use orgdir_core::{OrganizationId, UserId};
use orgdir_directory::{Organization, User};

use crate::store::{DirectoryStore, StoreError};

/// Password shared by every seeded account.
pub const DEMO_PASSWORD: &str = "123123";

#[derive(Debug, Error)]
pub enum SeedError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Hashing(#[from] AuthError),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub organizations: usize,
    pub users: usize,
}

/// Insert the demo directory. Skipped when `admin1@example.com` already
/// exists, so running it twice is harmless.
///
/// Accounts are `{role}{n}@example.com` (`admin1` .. `admin4`, `viewer1` ..,
/// `user1` ..); `n` 1-2 belong to `Organization1`, 3-4 to `Organization2`.
pub async fn seed_demo_data(
    store: &dyn DirectoryStore,
    hasher: &PasswordHasher,
) -> Result<SeedSummary, SeedError> {
    if store.email_exists("admin1@example.com").await? {
        info!("demo data already present; skipping seed");
        return Ok(SeedSummary::default());
    }

    let orgs = [
        ("Organization1", "123456789", "Address1"),
        ("Organization2", "987654321", "Address2"),
    ];
    let mut org_ids = Vec::with_capacity(orgs.len());
    for (name, phone, address) in orgs {
        let org = store
            .insert_organization(Organization {
                id: OrganizationId::new(),
                name: name.into(),
                phone: phone.into(),
                address: address.into(),
            })
            .await?;
        org_ids.push(org.id);
    }

    let birthdate = NaiveDate::from_ymd_opt(1990, 1, 1).unwrap_or_default();
    let mut users = 0;
    for role in Role::ALL {
        for (idx, org_id) in org_ids.iter().enumerate() {
            for i in 1..=2 {
                let n = idx * 2 + i;
                let user = store
                    .insert_user(User {
                        id: UserId::new(),
                        name: format!("{} User {n}", role.as_str()),
                        email: format!("{}{n}@example.com", role.as_str().to_lowercase()),
                        phone: String::new(),
                        birthdate,
                        organization_id: *org_id,
                        role,
                        password_hash: hasher.hash(DEMO_PASSWORD)?,
                    })
                    .await?;
                store.link_group(user.id, role.group_name()).await?;
                users += 1;
            }
        }
    }

    let summary = SeedSummary {
        organizations: org_ids.len(),
        users,
    };
    info!(organizations = summary.organizations, users = summary.users, "seeded demo data");
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{InMemoryDirectoryStore, UserQuery};

    #[tokio::test]
    async fn seeds_two_orgs_with_two_accounts_per_role_each() {
        let store = InMemoryDirectoryStore::new();
        let hasher = PasswordHasher::with_params(1024, 1, 1).unwrap();

        let summary = seed_demo_data(&store, &hasher).await.unwrap();
        assert_eq!(summary, SeedSummary { organizations: 2, users: 12 });

        let orgs = store.list_organizations().await.unwrap();
        assert_eq!(orgs.len(), 2);
        let first = orgs.iter().find(|o| o.name == "Organization1").unwrap();
        let members = store.list_users(&UserQuery::in_organization(first.id)).await.unwrap();
        assert_eq!(members.len(), 6);

        let viewer3 = store.find_user_by_email("viewer3@example.com").await.unwrap().unwrap();
        assert_eq!(viewer3.role, Role::Viewer);
        assert_ne!(viewer3.organization_id, first.id);
        assert!(hasher.verify(DEMO_PASSWORD, &viewer3.password_hash).unwrap());
        assert_eq!(store.user_groups(viewer3.id).await.unwrap()[0].name, "Viewer");
    }

    #[tokio::test]
    async fn second_run_is_a_no_op() {
        let store = InMemoryDirectoryStore::new();
        let hasher = PasswordHasher::with_params(1024, 1, 1).unwrap();

        seed_demo_data(&store, &hasher).await.unwrap();
        let again = seed_demo_data(&store, &hasher).await.unwrap();

        assert_eq!(again, SeedSummary::default());
        assert_eq!(store.list_organizations().await.unwrap().len(), 2);
    }
}
