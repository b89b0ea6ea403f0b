//! Directory orchestration: load targets, ask the policy, validate, write.
//!
//! Handlers stay thin; every rule about who may do what is decided by
//! `orgdir_auth::policy` via [`crate::authz::authorize`], and every
//! persistence rule by the [`DirectoryStore`].

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument, warn};

use orgdir_auth::{
    Caller, Decision, Operation, PasswordHasher, TokenCodec, TokenPair, TokenType, UserTarget, Visibility,
};
use orgdir_core::{OrganizationId, UserId};
use orgdir_directory::{
    Group, NewOrganization, NewUser, Organization, OrganizationPatch, User, UserPatch, normalize_email,
};
use orgdir_infra::{DirectoryStore, HttpIpLookup, PublicIpLookup, UserQuery};

use crate::app::errors::ServiceError;
use crate::authz::authorize;
use crate::config::GroupLinkFailure;

/// A user together with its organization's display name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub user: User,
    pub organization_name: String,
}

/// Payload of `GET /info`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct CallerInfo {
    pub user_name: String,
    pub id: UserId,
    pub organization_name: String,
    pub public_ip: String,
}

pub type ServiceResult<T> = Result<T, ServiceError>;

pub struct DirectoryService {
    store: Arc<dyn DirectoryStore>,
    hasher: PasswordHasher,
    tokens: Arc<TokenCodec>,
    ip_lookup: Arc<dyn PublicIpLookup>,
    group_link_failure: GroupLinkFailure,
}

impl DirectoryService {
    pub fn new(store: Arc<dyn DirectoryStore>, tokens: TokenCodec) -> Self {
        Self {
            store,
            hasher: PasswordHasher::new(),
            tokens: Arc::new(tokens),
            ip_lookup: Arc::new(HttpIpLookup::default()),
            group_link_failure: GroupLinkFailure::default(),
        }
    }

    pub fn with_hasher(mut self, hasher: PasswordHasher) -> Self {
        self.hasher = hasher;
        self
    }

    pub fn with_ip_lookup(mut self, ip_lookup: Arc<dyn PublicIpLookup>) -> Self {
        self.ip_lookup = ip_lookup;
        self
    }

    pub fn with_group_link_failure(mut self, mode: GroupLinkFailure) -> Self {
        self.group_link_failure = mode;
        self
    }

    pub fn hasher(&self) -> &PasswordHasher {
        &self.hasher
    }

    // -------------------------
    // Authentication
    // -------------------------

    #[instrument(skip(self, password), err)]
    pub async fn login(&self, email: Option<&str>, password: Option<&str>) -> ServiceResult<TokenPair> {
        let (Some(email), Some(password)) = (email, password) else {
            return Err(ServiceError::InvalidCredentials);
        };
        let Some(user) = self.store.find_user_by_email(&normalize_email(email)).await? else {
            return Err(ServiceError::InvalidCredentials);
        };
        if !self.hasher.verify(password, &user.password_hash)? {
            return Err(ServiceError::InvalidCredentials);
        }

        info!(user_id = %user.id, "login succeeded");
        Ok(self.tokens.issue_pair(user.id, Utc::now())?)
    }

    /// Exchange a refresh token for a new access token.
    pub async fn refresh(&self, refresh_token: &str) -> ServiceResult<String> {
        let now = Utc::now();
        let claims = self.tokens.decode(refresh_token, TokenType::Refresh, now)?;
        if self.store.get_user(claims.sub).await?.is_none() {
            return Err(ServiceError::Unauthorized("token subject no longer exists".into()));
        }
        Ok(self.tokens.issue(claims.sub, TokenType::Access, now)?)
    }

    /// Resolve a bearer access token to the caller it names.
    ///
    /// Role and organization come from the stored user, not from the token.
    pub async fn authenticate(&self, access_token: &str) -> ServiceResult<Caller> {
        let claims = self.tokens.decode(access_token, TokenType::Access, Utc::now())?;
        let user = self
            .store
            .get_user(claims.sub)
            .await?
            .ok_or_else(|| ServiceError::Unauthorized("token subject no longer exists".into()))?;
        Ok(Caller::new(user.id, user.role, user.organization_id, user.email))
    }

    pub async fn list_groups(&self, caller: &Caller) -> ServiceResult<Vec<Group>> {
        authorize(caller, &Operation::ListGroups)?;
        Ok(self.store.list_groups().await?)
    }

    // -------------------------
    // Users
    // -------------------------

    #[instrument(skip(self, caller), fields(caller = %caller.id), err)]
    pub async fn list_users(
        &self,
        caller: &Caller,
        search: Option<String>,
        phone: Option<String>,
    ) -> ServiceResult<Vec<UserRecord>> {
        let visibility = match authorize(caller, &Operation::ListUsers)? {
            Decision::AllowScoped(v) => v,
            Decision::Allow => Visibility::for_caller(caller),
        };
        let query = UserQuery::scoped(visibility).with_search(search).with_phone(phone);
        let users = self.store.list_users(&query).await?;
        self.with_organization_names(users).await
    }

    #[instrument(skip(self, caller), fields(caller = %caller.id), err)]
    pub async fn get_user(&self, caller: &Caller, id: UserId) -> ServiceResult<UserRecord> {
        let user = self.store.get_user(id).await?;
        authorize(caller, &Operation::ReadUser(user.as_ref().map(target)))?;
        let user = user.ok_or(ServiceError::NotFound)?;
        self.with_organization_name(user).await
    }

    #[instrument(skip(self, caller, payload), fields(caller = %caller.id), err)]
    pub async fn create_user(&self, caller: &Caller, payload: NewUser) -> ServiceResult<UserRecord> {
        let email = payload.normalized_email();
        let email_taken = match &email {
            Some(email) => self.store.email_exists(email).await?,
            None => false,
        };
        authorize(
            caller,
            &Operation::CreateUser {
                email: email.as_deref(),
                email_taken,
            },
        )?;

        let draft = payload.validate()?;
        let password_hash = self.hasher.hash(&draft.password)?;
        let user = self
            .store
            .insert_user(draft.into_user(UserId::new(), password_hash))
            .await?;

        self.link_role_group(&user).await?;

        info!(user_id = %user.id, role = %user.role, organization_id = %user.organization_id, "user created");
        self.with_organization_name(user).await
    }

    /// Partial update. A `password` is hashed and applied on its own; the
    /// remaining fields go through [`UserPatch`] validation. Nothing is
    /// written unless every supplied field is valid.
    #[instrument(skip(self, caller, patch, password), fields(caller = %caller.id), err)]
    pub async fn update_user(
        &self,
        caller: &Caller,
        id: UserId,
        patch: UserPatch,
        password: Option<String>,
    ) -> ServiceResult<UserRecord> {
        let existing = self.store.get_user(id).await?;
        authorize(caller, &Operation::UpdateUser(existing.as_ref().map(target)))?;
        let existing = existing.ok_or(ServiceError::NotFound)?;

        let password_hash = match password {
            Some(p) if p.is_empty() => {
                return Err(ServiceError::Validation("password: this field may not be blank".into()));
            }
            Some(p) => Some(self.hasher.hash(&p)?),
            None => None,
        };

        let updated = patch.apply_to(&existing, password_hash)?;
        let updated = self.store.update_user(updated).await?;
        self.with_organization_name(updated).await
    }

    #[instrument(skip(self, caller), fields(caller = %caller.id), err)]
    pub async fn delete_user(&self, caller: &Caller, id: UserId) -> ServiceResult<()> {
        let existing = self.store.get_user(id).await?;
        authorize(caller, &Operation::DeleteUser(existing.as_ref().map(target)))?;
        self.store.delete_user(id).await?;
        info!(user_id = %id, "user deleted");
        Ok(())
    }

    async fn link_role_group(&self, user: &User) -> ServiceResult<()> {
        let group = user.role.group_name();
        let Err(err) = self.store.link_group(user.id, group).await else {
            return Ok(());
        };

        match self.group_link_failure {
            GroupLinkFailure::Ignore => {
                warn!(user_id = %user.id, group, error = %err, "role group link failed; keeping user");
                Ok(())
            }
            GroupLinkFailure::Fail => {
                warn!(user_id = %user.id, group, error = %err, "role group link failed; removing user");
                if let Err(cleanup) = self.store.delete_user(user.id).await {
                    warn!(user_id = %user.id, error = %cleanup, "failed to remove partially created user");
                }
                Err(ServiceError::Internal(format!("failed to link user to group '{group}': {err}")))
            }
        }
    }

    // -------------------------
    // Organizations
    // -------------------------

    pub async fn list_organizations(&self, caller: &Caller) -> ServiceResult<Vec<Organization>> {
        authorize(caller, &Operation::ListOrganizations)?;
        Ok(self.store.list_organizations().await?)
    }

    pub async fn get_organization(&self, caller: &Caller, id: OrganizationId) -> ServiceResult<Organization> {
        authorize(caller, &Operation::ReadOrganization)?;
        self.store.get_organization(id).await?.ok_or(ServiceError::NotFound)
    }

    #[instrument(skip(self, caller, payload), fields(caller = %caller.id), err)]
    pub async fn create_organization(&self, caller: &Caller, payload: NewOrganization) -> ServiceResult<Organization> {
        authorize(caller, &Operation::CreateOrganization)?;
        let org = payload.into_organization(OrganizationId::new())?;
        let org = self.store.insert_organization(org).await?;
        info!(organization_id = %org.id, "organization created");
        Ok(org)
    }

    #[instrument(skip(self, caller, patch), fields(caller = %caller.id), err)]
    pub async fn update_organization(
        &self,
        caller: &Caller,
        id: OrganizationId,
        patch: OrganizationPatch,
    ) -> ServiceResult<Organization> {
        authorize(caller, &Operation::UpdateOrganization)?;
        let existing = self.store.get_organization(id).await?.ok_or(ServiceError::NotFound)?;
        let updated = patch.apply_to(&existing)?;
        Ok(self.store.update_organization(updated).await?)
    }

    #[instrument(skip(self, caller), fields(caller = %caller.id), err)]
    pub async fn delete_organization(&self, caller: &Caller, id: OrganizationId) -> ServiceResult<()> {
        authorize(caller, &Operation::DeleteOrganization)?;
        self.store.delete_organization(id).await?;
        info!(organization_id = %id, "organization deleted");
        Ok(())
    }

    /// Users of any organization, for the minimal `{id, name}` view.
    pub async fn list_organization_users(&self, caller: &Caller, org: OrganizationId) -> ServiceResult<Vec<User>> {
        authorize(caller, &Operation::ListOrganizationUsers)?;
        Ok(self.store.list_users(&UserQuery::in_organization(org)).await?)
    }

    pub async fn get_organization_user(
        &self,
        caller: &Caller,
        org: OrganizationId,
        id: UserId,
    ) -> ServiceResult<User> {
        authorize(caller, &Operation::ReadOrganizationUser)?;
        self.store
            .get_user(id)
            .await?
            .filter(|u| u.organization_id == org)
            .ok_or(ServiceError::NotFound)
    }

    // -------------------------
    // Info
    // -------------------------

    pub async fn info(&self, caller: &Caller) -> ServiceResult<CallerInfo> {
        authorize(caller, &Operation::ReadInfo)?;
        let user = self
            .store
            .get_user(caller.id)
            .await?
            .ok_or_else(|| ServiceError::Unauthorized("token subject no longer exists".into()))?;
        let organization_name = self.organization_name(user.organization_id).await?;
        let public_ip = self.ip_lookup.public_ip().await?;

        Ok(CallerInfo {
            user_name: user.name,
            id: user.id,
            organization_name,
            public_ip,
        })
    }

    // -------------------------
    // Helpers
    // -------------------------

    async fn organization_name(&self, id: OrganizationId) -> ServiceResult<String> {
        Ok(self
            .store
            .get_organization(id)
            .await?
            .map(|o| o.name)
            .unwrap_or_default())
    }

    async fn with_organization_name(&self, user: User) -> ServiceResult<UserRecord> {
        let organization_name = self.organization_name(user.organization_id).await?;
        Ok(UserRecord { user, organization_name })
    }

    async fn with_organization_names(&self, users: Vec<User>) -> ServiceResult<Vec<UserRecord>> {
        let mut names: BTreeMap<OrganizationId, String> = BTreeMap::new();
        let mut records = Vec::with_capacity(users.len());
        for user in users {
            let organization_name = match names.get(&user.organization_id) {
                Some(name) => name.clone(),
                None => {
                    let name = self.organization_name(user.organization_id).await?;
                    names.insert(user.organization_id, name.clone());
                    name
                }
            };
            records.push(UserRecord { user, organization_name });
        }
        Ok(records)
    }
}

fn target(user: &User) -> UserTarget {
    UserTarget {
        id: user.id,
        organization_id: user.organization_id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use orgdir_auth::{AuthConfig, PolicyError, Role};
    use orgdir_infra::{InMemoryDirectoryStore, StaticIpLookup};

    struct Fixture {
        service: DirectoryService,
        store: Arc<InMemoryDirectoryStore>,
        org_a: OrganizationId,
        org_b: OrganizationId,
    }

    async fn fixture_with(store: InMemoryDirectoryStore, mode: GroupLinkFailure) -> Fixture {
        let store = Arc::new(store);
        let org_a = store
            .insert_organization(Organization {
                id: OrganizationId::new(),
                name: "A".into(),
                phone: String::new(),
                address: String::new(),
            })
            .await
            .unwrap()
            .id;
        let org_b = store
            .insert_organization(Organization {
                id: OrganizationId::new(),
                name: "B".into(),
                phone: String::new(),
                address: String::new(),
            })
            .await
            .unwrap()
            .id;

        let service = DirectoryService::new(store.clone(), TokenCodec::new(AuthConfig::default()))
            .with_hasher(PasswordHasher::with_params(1024, 1, 1).unwrap())
            .with_ip_lookup(Arc::new(StaticIpLookup::ok("198.51.100.1")))
            .with_group_link_failure(mode);

        Fixture {
            service,
            store,
            org_a,
            org_b,
        }
    }

    async fn fixture() -> Fixture {
        fixture_with(InMemoryDirectoryStore::new(), GroupLinkFailure::Ignore).await
    }

    impl Fixture {
        async fn add_user(&self, org: OrganizationId, email: &str, role: Role) -> Caller {
            let user = User {
                id: UserId::new(),
                name: email.split('@').next().unwrap_or_default().to_string(),
                email: email.to_string(),
                phone: "555".into(),
                birthdate: NaiveDate::from_ymd_opt(1990, 1, 1).unwrap(),
                organization_id: org,
                role,
                password_hash: self.service.hasher().hash("pw").unwrap(),
            };
            let user = self.store.insert_user(user).await.unwrap();
            Caller::new(user.id, user.role, user.organization_id, user.email)
        }
    }

    fn new_user(email: &str, org: OrganizationId, role: &str) -> NewUser {
        NewUser {
            name: Some("New".into()),
            email: Some(email.into()),
            phone: Some("123".into()),
            birthdate: Some("2000-02-29".into()),
            organization_id: Some(org.to_string()),
            role: Some(role.into()),
            password: Some("pw".into()),
        }
    }

    #[tokio::test]
    async fn admin_creates_user_and_links_role_group() {
        let f = fixture().await;
        let admin = f.add_user(f.org_a, "admin@test.com", Role::Admin).await;

        let created = f
            .service
            .create_user(&admin, new_user("X@Test.com", f.org_b, "VIEWER"))
            .await
            .unwrap();

        assert_eq!(created.user.email, "x@test.com");
        assert_eq!(created.organization_name, "B");
        let groups = f.store.user_groups(created.user.id).await.unwrap();
        assert_eq!(groups, vec![Group::new("Viewer")]);
    }

    #[tokio::test]
    async fn duplicate_email_is_reported_before_role_denial() {
        let f = fixture().await;
        let viewer = f.add_user(f.org_a, "viewer@test.com", Role::Viewer).await;
        f.add_user(f.org_a, "taken@test.com", Role::User).await;

        let err = f
            .service
            .create_user(&viewer, new_user("taken@test.com", f.org_a, "USER"))
            .await
            .unwrap_err();
        assert_eq!(err, ServiceError::Policy(PolicyError::DuplicateEmail));

        let err = f
            .service
            .create_user(&viewer, new_user("fresh@test.com", f.org_a, "USER"))
            .await
            .unwrap_err();
        assert_eq!(err, ServiceError::Policy(PolicyError::ViewerCannotCreate));
    }

    #[tokio::test]
    async fn invalid_payload_is_rejected_after_authorization() {
        let f = fixture().await;
        let admin = f.add_user(f.org_a, "admin@test.com", Role::Admin).await;
        let mut payload = new_user("x@test.com", f.org_a, "USER");
        payload.birthdate = None;

        let err = f.service.create_user(&admin, payload).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(m) if m.starts_with("birthdate")));
        assert!(!f.store.email_exists("x@test.com").await.unwrap());
    }

    #[tokio::test]
    async fn group_link_failure_is_ignored_by_default() {
        let f = fixture_with(InMemoryDirectoryStore::without_groups(), GroupLinkFailure::Ignore).await;
        let admin = f.add_user(f.org_a, "admin@test.com", Role::Admin).await;

        let created = f
            .service
            .create_user(&admin, new_user("x@test.com", f.org_a, "USER"))
            .await
            .unwrap();
        assert!(f.store.get_user(created.user.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn group_link_failure_can_roll_back_the_user() {
        let f = fixture_with(InMemoryDirectoryStore::without_groups(), GroupLinkFailure::Fail).await;
        let admin = f.add_user(f.org_a, "admin@test.com", Role::Admin).await;

        let err = f
            .service
            .create_user(&admin, new_user("x@test.com", f.org_a, "USER"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Internal(_)));
        assert!(!f.store.email_exists("x@test.com").await.unwrap());
    }

    #[tokio::test]
    async fn user_listing_is_scoped_by_role() {
        let f = fixture().await;
        let admin = f.add_user(f.org_a, "admin@test.com", Role::Admin).await;
        let user = f.add_user(f.org_a, "user@test.com", Role::User).await;
        f.add_user(f.org_b, "other@test.com", Role::Viewer).await;

        let seen_by_admin = f.service.list_users(&admin, None, None).await.unwrap();
        assert_eq!(seen_by_admin.len(), 2);
        assert!(seen_by_admin.iter().all(|r| r.user.organization_id == f.org_a));

        let seen_by_user = f.service.list_users(&user, None, None).await.unwrap();
        assert_eq!(seen_by_user.len(), 1);
        assert_eq!(seen_by_user[0].user.id, user.id);

        let searched = f
            .service
            .list_users(&admin, Some("USER@".into()), None)
            .await
            .unwrap();
        assert_eq!(searched.len(), 1);
    }

    #[tokio::test]
    async fn password_update_rotates_credential() {
        let f = fixture().await;
        let user = f.add_user(f.org_a, "user@test.com", Role::User).await;

        f.service
            .update_user(&user, user.id, UserPatch::default(), Some("new-pw".into()))
            .await
            .unwrap();

        let stored = f.store.get_user(user.id).await.unwrap().unwrap();
        assert!(f.service.hasher().verify("new-pw", &stored.password_hash).unwrap());
        assert!(!f.service.hasher().verify("pw", &stored.password_hash).unwrap());
        assert!(f.service.login(Some("user@test.com"), Some("new-pw")).await.is_ok());
    }

    #[tokio::test]
    async fn invalid_patch_writes_nothing() {
        let f = fixture().await;
        let user = f.add_user(f.org_a, "user@test.com", Role::User).await;
        let patch = UserPatch {
            birthdate: Some("not a date".into()),
            ..Default::default()
        };

        let err = f
            .service
            .update_user(&user, user.id, patch, Some("new-pw".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
        assert!(f.service.login(Some("user@test.com"), Some("pw")).await.is_ok());
    }

    #[tokio::test]
    async fn login_rejects_unknown_email_and_wrong_password_alike() {
        let f = fixture().await;
        f.add_user(f.org_a, "user@test.com", Role::User).await;

        let unknown = f.service.login(Some("nobody@test.com"), Some("pw")).await.unwrap_err();
        let wrong = f.service.login(Some("user@test.com"), Some("nope")).await.unwrap_err();
        assert_eq!(unknown, ServiceError::InvalidCredentials);
        assert_eq!(wrong, ServiceError::InvalidCredentials);
    }

    #[tokio::test]
    async fn tokens_for_deleted_users_stop_working() {
        let f = fixture().await;
        let admin = f.add_user(f.org_a, "admin@test.com", Role::Admin).await;
        let user = f.add_user(f.org_a, "user@test.com", Role::User).await;
        let pair = f.service.login(Some("user@test.com"), Some("pw")).await.unwrap();

        assert_eq!(f.service.authenticate(&pair.access).await.unwrap(), user);
        f.service.delete_user(&admin, user.id).await.unwrap();

        assert!(matches!(
            f.service.authenticate(&pair.access).await,
            Err(ServiceError::Unauthorized(_))
        ));
        assert!(matches!(f.service.refresh(&pair.refresh).await, Err(ServiceError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn organization_delete_cascades() {
        let f = fixture().await;
        let admin = f.add_user(f.org_a, "admin@test.com", Role::Admin).await;
        let member = f.add_user(f.org_b, "member@test.com", Role::User).await;

        f.service.delete_organization(&admin, f.org_b).await.unwrap();

        assert!(f.store.get_user(member.id).await.unwrap().is_none());
        assert_eq!(
            f.service.get_organization(&admin, f.org_b).await.unwrap_err(),
            ServiceError::NotFound
        );
    }

    #[tokio::test]
    async fn organization_user_detail_requires_matching_organization() {
        let f = fixture().await;
        let viewer = f.add_user(f.org_a, "viewer@test.com", Role::Viewer).await;
        let member = f.add_user(f.org_b, "member@test.com", Role::User).await;

        let found = f
            .service
            .get_organization_user(&viewer, f.org_b, member.id)
            .await
            .unwrap();
        assert_eq!(found.id, member.id);
        assert_eq!(
            f.service
                .get_organization_user(&viewer, f.org_a, member.id)
                .await
                .unwrap_err(),
            ServiceError::NotFound
        );
    }

    #[tokio::test]
    async fn info_reports_caller_and_public_ip() {
        let f = fixture().await;
        let user = f.add_user(f.org_a, "user@test.com", Role::User).await;

        let info = f.service.info(&user).await.unwrap();
        assert_eq!(info.user_name, "user");
        assert_eq!(info.organization_name, "A");
        assert_eq!(info.public_ip, "198.51.100.1");
    }
}
