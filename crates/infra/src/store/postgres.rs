//! Postgres-backed directory store.
//!
//! ## Error Mapping
//!
//! | PostgreSQL Error Code | Constraint | StoreError |
//! |-----------------------|------------|------------|
//! | `23505` unique violation | `users_email_key` | `DuplicateEmail` |
//! | `23503` foreign key violation | `users_organization_id_fkey` | `UnknownOrganization` |
//! | `23503` foreign key violation | `user_groups_group_name_fkey` | `UnknownGroup` |
//! | `23503` foreign key violation | `user_groups_user_id_fkey` | `NotFound` |
//! | anything else | | `Storage` |

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{PgPool, Row, postgres::PgRow};
use tracing::instrument;
use uuid::Uuid;

use orgdir_auth::Role;
use orgdir_core::{OrganizationId, UserId};
use orgdir_directory::{Group, Organization, User};

use super::{DirectoryStore, StoreError, UserQuery};

const SCHEMA: &str = include_str!("../../migrations/0001_directory.sql");

const USER_COLUMNS: &str =
    "id, name, email, phone, birthdate, organization_id, role, password_hash";

/// Directory store over a SQLx connection pool.
///
/// Uniqueness and referential integrity are enforced by the schema in
/// `migrations/`, so concurrent writers cannot race past them.
#[derive(Debug, Clone)]
pub struct PostgresDirectoryStore {
    pool: Arc<PgPool>,
}

impl PostgresDirectoryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool: Arc::new(pool) }
    }

    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Create tables and seed the role groups. Idempotent.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("migrate", e))?;
        Ok(())
    }
}

#[async_trait]
impl DirectoryStore for PostgresDirectoryStore {
    #[instrument(skip(self), fields(user_id = %id), err)]
    async fn get_user(&self, id: UserId) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_user", e))?;
        row.as_ref().map(user_from_row).transpose()
    }

    #[instrument(skip(self), err)]
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let row = sqlx::query(&sql)
            .bind(email)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_user_by_email", e))?;
        row.as_ref().map(user_from_row).transpose()
    }

    #[instrument(skip(self), err)]
    async fn list_users(&self, query: &UserQuery) -> Result<Vec<User>, StoreError> {
        let sql = format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users
            WHERE ($1::uuid IS NULL OR organization_id = $1)
              AND ($2::uuid IS NULL OR id = $2)
              AND NOT EXISTS (
                  SELECT 1 FROM unnest($3::text[]) AS term
                  WHERE NOT (name ILIKE term OR email ILIKE term)
              )
              AND ($4::text IS NULL OR phone = $4)
            ORDER BY id ASC
            "#
        );
        let rows = sqlx::query(&sql)
            .bind(query.organization_id.map(|o| o.as_uuid()))
            .bind(query.user_id.map(|u| u.as_uuid()))
            .bind(query.search_terms.iter().map(|t| like_pattern(t)).collect::<Vec<_>>())
            .bind(query.phone.as_deref())
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_users", e))?;

        rows.iter().map(user_from_row).collect()
    }

    #[instrument(skip(self, user), fields(user_id = %user.id), err)]
    async fn insert_user(&self, user: User) -> Result<User, StoreError> {
        sqlx::query(
            r#"
            INSERT INTO users (id, name, email, phone, birthdate, organization_id, role, password_hash)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(user.id.as_uuid())
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.phone)
        .bind(user.birthdate)
        .bind(user.organization_id.as_uuid())
        .bind(user.role.as_str())
        .bind(&user.password_hash)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_user_write_error("insert_user", e, user.organization_id))?;
        Ok(user)
    }

    #[instrument(skip(self, user), fields(user_id = %user.id), err)]
    async fn update_user(&self, user: User) -> Result<User, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET name = $2, email = $3, phone = $4, birthdate = $5,
                organization_id = $6, role = $7, password_hash = $8
            WHERE id = $1
            "#,
        )
        .bind(user.id.as_uuid())
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.phone)
        .bind(user.birthdate)
        .bind(user.organization_id.as_uuid())
        .bind(user.role.as_str())
        .bind(&user.password_hash)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_user_write_error("update_user", e, user.organization_id))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(user)
    }

    #[instrument(skip(self), fields(user_id = %id), err)]
    async fn delete_user(&self, id: UserId) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_user", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    #[instrument(skip(self), fields(user_id = %user), err)]
    async fn link_group(&self, user: UserId, group: &str) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO user_groups (user_id, group_name)
            VALUES ($1, $2)
            ON CONFLICT (user_id, group_name) DO NOTHING
            "#,
        )
        .bind(user.as_uuid())
        .bind(group)
        .execute(&*self.pool)
        .await
        .map_err(|e| match foreign_key_constraint(&e).as_deref() {
            Some("user_groups_group_name_fkey") => StoreError::UnknownGroup(group.to_string()),
            Some("user_groups_user_id_fkey") => StoreError::NotFound,
            _ => map_sqlx_error("link_group", e),
        })?;
        Ok(())
    }

    async fn user_groups(&self, user: UserId) -> Result<Vec<Group>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT g.name
            FROM user_groups ug
            JOIN groups g ON g.name = ug.group_name
            WHERE ug.user_id = $1
            ORDER BY g.position ASC
            "#,
        )
        .bind(user.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("user_groups", e))?;

        rows.iter().map(group_from_row).collect()
    }

    async fn list_groups(&self) -> Result<Vec<Group>, StoreError> {
        let rows = sqlx::query("SELECT name FROM groups ORDER BY position ASC, name ASC")
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_groups", e))?;

        rows.iter().map(group_from_row).collect()
    }

    #[instrument(skip(self), fields(organization_id = %id), err)]
    async fn get_organization(&self, id: OrganizationId) -> Result<Option<Organization>, StoreError> {
        let row = sqlx::query("SELECT id, name, phone, address FROM organizations WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_organization", e))?;

        row.as_ref().map(organization_from_row).transpose()
    }

    async fn list_organizations(&self) -> Result<Vec<Organization>, StoreError> {
        let rows = sqlx::query("SELECT id, name, phone, address FROM organizations ORDER BY id ASC")
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_organizations", e))?;

        rows.iter().map(organization_from_row).collect()
    }

    #[instrument(skip(self, org), fields(organization_id = %org.id), err)]
    async fn insert_organization(&self, org: Organization) -> Result<Organization, StoreError> {
        sqlx::query("INSERT INTO organizations (id, name, phone, address) VALUES ($1, $2, $3, $4)")
            .bind(org.id.as_uuid())
            .bind(&org.name)
            .bind(&org.phone)
            .bind(&org.address)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("insert_organization", e))?;
        Ok(org)
    }

    #[instrument(skip(self, org), fields(organization_id = %org.id), err)]
    async fn update_organization(&self, org: Organization) -> Result<Organization, StoreError> {
        let result = sqlx::query("UPDATE organizations SET name = $2, phone = $3, address = $4 WHERE id = $1")
            .bind(org.id.as_uuid())
            .bind(&org.name)
            .bind(&org.phone)
            .bind(&org.address)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("update_organization", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(org)
    }

    #[instrument(skip(self), fields(organization_id = %id), err)]
    async fn delete_organization(&self, id: OrganizationId) -> Result<(), StoreError> {
        // Users and their group links go with it via ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM organizations WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_organization", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

/// `%needle%` with LIKE metacharacters escaped.
fn like_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

fn user_from_row(row: &PgRow) -> Result<User, StoreError> {
    let decode = |e: sqlx::Error| StoreError::Storage(format!("failed to decode user row: {e}"));

    let role: String = row.try_get("role").map_err(decode)?;
    let role = role
        .parse::<Role>()
        .map_err(|e| StoreError::Storage(format!("failed to decode user row: {e}")))?;

    Ok(User {
        id: UserId::from_uuid(row.try_get::<Uuid, _>("id").map_err(decode)?),
        name: row.try_get("name").map_err(decode)?,
        email: row.try_get("email").map_err(decode)?,
        phone: row.try_get("phone").map_err(decode)?,
        birthdate: row.try_get::<NaiveDate, _>("birthdate").map_err(decode)?,
        organization_id: OrganizationId::from_uuid(row.try_get::<Uuid, _>("organization_id").map_err(decode)?),
        role,
        password_hash: row.try_get("password_hash").map_err(decode)?,
    })
}

fn organization_from_row(row: &PgRow) -> Result<Organization, StoreError> {
    let decode = |e: sqlx::Error| StoreError::Storage(format!("failed to decode organization row: {e}"));
    Ok(Organization {
        id: OrganizationId::from_uuid(row.try_get::<Uuid, _>("id").map_err(decode)?),
        name: row.try_get("name").map_err(decode)?,
        phone: row.try_get("phone").map_err(decode)?,
        address: row.try_get("address").map_err(decode)?,
    })
}

fn group_from_row(row: &PgRow) -> Result<Group, StoreError> {
    let name: String = row
        .try_get("name")
        .map_err(|e| StoreError::Storage(format!("failed to decode group row: {e}")))?;
    Ok(Group::new(name))
}

fn foreign_key_constraint(err: &sqlx::Error) -> Option<String> {
    match err {
        sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23503") => {
            db_err.constraint().map(str::to_string)
        }
        _ => None,
    }
}

fn map_user_write_error(operation: &str, err: sqlx::Error, organization_id: OrganizationId) -> StoreError {
    if foreign_key_constraint(&err).as_deref() == Some("users_organization_id_fkey") {
        return StoreError::UnknownOrganization(organization_id);
    }
    map_sqlx_error(operation, err)
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") if db_err.constraint() == Some("users_email_key") => StoreError::DuplicateEmail,
                _ => StoreError::Storage(msg),
            }
        }
        sqlx::Error::PoolClosed => StoreError::Storage(format!("connection pool closed in {}", operation)),
        _ => StoreError::Storage(format!("sqlx error in {}: {}", operation, err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_escapes_metacharacters() {
        assert_eq!(like_pattern("ada"), "%ada%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }

    #[test]
    fn schema_declares_the_constraints_errors_are_mapped_from() {
        assert!(SCHEMA.contains("CONSTRAINT users_email_key UNIQUE (email)"));
        assert!(SCHEMA.contains("REFERENCES organizations (id) ON DELETE CASCADE"));
        assert!(SCHEMA.contains("REFERENCES groups (name)"));
    }
}
