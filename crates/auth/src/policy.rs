//! Role-based authorization policy for users and organizations.
//!
//! One decision function, [`check`], maps `(caller, operation)` to allow/deny.
//! Every rule lives in that function so the precedence between checks is
//! visible in one place:
//!
//! | Operation                         | ADMIN            | VIEWER           | USER        |
//! |-----------------------------------|------------------|------------------|-------------|
//! | list users                        | own organization | own organization | self        |
//! | read user                         | own organization | own organization | self        |
//! | create user                       | yes              | no               | own email   |
//! | update user                       | own organization | no               | self        |
//! | delete user                       | own organization | no               | no          |
//! | list / read organization          | yes              | yes              | no          |
//! | create / update / delete org      | yes              | no               | no          |
//! | organization user listing         | yes              | yes              | no          |
//! | role groups, caller info          | yes              | yes              | yes         |
//!
//! The policy performs no IO. Callers load the target record first and pass
//! `None` when it does not exist; the policy decides whether that surfaces as
//! `NotFound` or whether a role denial wins.

use serde::Serialize;
use thiserror::Error;

use orgdir_core::{OrganizationId, UserId};

use crate::{Caller, Role};

/// The parts of a user record the policy needs to see.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct UserTarget {
    pub id: UserId,
    pub organization_id: OrganizationId,
}

/// Operation being attempted, with whatever target facts the rules need.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation<'a> {
    ListUsers,
    ReadUser(Option<UserTarget>),
    CreateUser {
        /// Normalized email from the payload, if any.
        email: Option<&'a str>,
        /// Whether a user with that email already exists.
        email_taken: bool,
    },
    UpdateUser(Option<UserTarget>),
    DeleteUser(Option<UserTarget>),
    ListOrganizations,
    ReadOrganization,
    CreateOrganization,
    UpdateOrganization,
    DeleteOrganization,
    ListOrganizationUsers,
    ReadOrganizationUser,
    ListGroups,
    ReadInfo,
}

/// Payload-free name of an operation (logging, role tables).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    ListUsers,
    ReadUser,
    CreateUser,
    UpdateUser,
    DeleteUser,
    ListOrganizations,
    ReadOrganization,
    CreateOrganization,
    UpdateOrganization,
    DeleteOrganization,
    ListOrganizationUsers,
    ReadOrganizationUser,
    ListGroups,
    ReadInfo,
}

impl Operation<'_> {
    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::ListUsers => OperationKind::ListUsers,
            Operation::ReadUser(_) => OperationKind::ReadUser,
            Operation::CreateUser { .. } => OperationKind::CreateUser,
            Operation::UpdateUser(_) => OperationKind::UpdateUser,
            Operation::DeleteUser(_) => OperationKind::DeleteUser,
            Operation::ListOrganizations => OperationKind::ListOrganizations,
            Operation::ReadOrganization => OperationKind::ReadOrganization,
            Operation::CreateOrganization => OperationKind::CreateOrganization,
            Operation::UpdateOrganization => OperationKind::UpdateOrganization,
            Operation::DeleteOrganization => OperationKind::DeleteOrganization,
            Operation::ListOrganizationUsers => OperationKind::ListOrganizationUsers,
            Operation::ReadOrganizationUser => OperationKind::ReadOrganizationUser,
            Operation::ListGroups => OperationKind::ListGroups,
            Operation::ReadInfo => OperationKind::ReadInfo,
        }
    }
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::ListUsers => "list_users",
            OperationKind::ReadUser => "read_user",
            OperationKind::CreateUser => "create_user",
            OperationKind::UpdateUser => "update_user",
            OperationKind::DeleteUser => "delete_user",
            OperationKind::ListOrganizations => "list_organizations",
            OperationKind::ReadOrganization => "read_organization",
            OperationKind::CreateOrganization => "create_organization",
            OperationKind::UpdateOrganization => "update_organization",
            OperationKind::DeleteOrganization => "delete_organization",
            OperationKind::ListOrganizationUsers => "list_organization_users",
            OperationKind::ReadOrganizationUser => "read_organization_user",
            OperationKind::ListGroups => "list_groups",
            OperationKind::ReadInfo => "read_info",
        }
    }

    /// Roles that may attempt the operation at all.
    ///
    /// Passing this gate is necessary but not sufficient: organization and
    /// ownership rules in [`check`] still apply.
    pub fn allowed_roles(&self) -> &'static [Role] {
        const EVERYONE: &[Role] = &[Role::Admin, Role::Viewer, Role::User];
        const STAFF: &[Role] = &[Role::Admin, Role::Viewer];
        const ADMIN: &[Role] = &[Role::Admin];

        match self {
            OperationKind::ListUsers | OperationKind::ReadUser => EVERYONE,
            OperationKind::CreateUser => &[Role::Admin, Role::User],
            OperationKind::UpdateUser => &[Role::Admin, Role::User],
            OperationKind::DeleteUser => ADMIN,
            OperationKind::ListOrganizations | OperationKind::ReadOrganization => STAFF,
            OperationKind::CreateOrganization
            | OperationKind::UpdateOrganization
            | OperationKind::DeleteOrganization => ADMIN,
            OperationKind::ListOrganizationUsers | OperationKind::ReadOrganizationUser => STAFF,
            OperationKind::ListGroups | OperationKind::ReadInfo => EVERYONE,
        }
    }
}

/// Which user records a list operation may return.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "scope", content = "id", rename_all = "snake_case")]
pub enum Visibility {
    /// Every user belonging to the organization.
    Organization(OrganizationId),
    /// Only the caller's own record.
    SelfOnly(UserId),
}

impl Visibility {
    pub fn for_caller(caller: &Caller) -> Self {
        match caller.role {
            Role::Admin | Role::Viewer => Visibility::Organization(caller.organization_id),
            Role::User => Visibility::SelfOnly(caller.id),
        }
    }

    pub fn admits(&self, target: &UserTarget) -> bool {
        match self {
            Visibility::Organization(org) => target.organization_id == *org,
            Visibility::SelfOnly(id) => target.id == *id,
        }
    }
}

/// Outcome of an allowed check.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    /// Allowed, but only records inside the visibility scope may be returned.
    AllowScoped(Visibility),
}

/// How a denial surfaces to the client.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialKind {
    Forbidden,
    BadRequest,
    NotFound,
}

/// Reason an operation was refused. The display strings are the messages
/// returned to clients.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum PolicyError {
    #[error("Not authorized")]
    NotAuthorized,

    #[error("Not authorized for Viewer")]
    ViewerCannotCreate,

    #[error("Not authorized to create account for others")]
    CreateForOthers,

    #[error("User with this email already exists")]
    DuplicateEmail,

    #[error("Not authorized to view user from another organization")]
    OtherOrganization,

    #[error("Not found.")]
    NotFound,
}

impl PolicyError {
    pub fn kind(&self) -> DenialKind {
        match self {
            PolicyError::DuplicateEmail => DenialKind::BadRequest,
            PolicyError::NotFound => DenialKind::NotFound,
            PolicyError::NotAuthorized
            | PolicyError::ViewerCannotCreate
            | PolicyError::CreateForOthers
            | PolicyError::OtherOrganization => DenialKind::Forbidden,
        }
    }
}

/// Decide whether `caller` may perform `op`.
///
/// - No IO
/// - No panics
/// - Pure function of its inputs
pub fn check(caller: &Caller, op: &Operation<'_>) -> Result<Decision, PolicyError> {
    match op {
        Operation::ListUsers => Ok(Decision::AllowScoped(Visibility::for_caller(caller))),

        Operation::ReadUser(target) => {
            let target = target.ok_or(PolicyError::NotFound)?;
            if target.organization_id != caller.organization_id {
                return Err(PolicyError::OtherOrganization);
            }
            if caller.role == Role::User && target.id != caller.id {
                return Err(PolicyError::NotAuthorized);
            }
            Ok(Decision::Allow)
        }

        Operation::CreateUser { email, email_taken } => {
            // Duplicate email wins over every role rule.
            if *email_taken {
                return Err(PolicyError::DuplicateEmail);
            }
            match caller.role {
                Role::User if *email != Some(caller.email.as_str()) => Err(PolicyError::CreateForOthers),
                Role::Viewer => Err(PolicyError::ViewerCannotCreate),
                Role::Admin | Role::User => Ok(Decision::Allow),
            }
        }

        Operation::UpdateUser(target) => {
            require_role(caller, OperationKind::UpdateUser)?;
            let target = target.ok_or(PolicyError::NotFound)?;
            let admin_of_same_org = caller.is_admin() && target.organization_id == caller.organization_id;
            let is_self = target.id == caller.id;
            if admin_of_same_org || is_self {
                Ok(Decision::Allow)
            } else {
                Err(PolicyError::NotAuthorized)
            }
        }

        Operation::DeleteUser(target) => {
            require_role(caller, OperationKind::DeleteUser)?;
            let target = target.ok_or(PolicyError::NotFound)?;
            if target.organization_id != caller.organization_id {
                return Err(PolicyError::NotAuthorized);
            }
            Ok(Decision::Allow)
        }

        other => {
            require_role(caller, other.kind())?;
            Ok(Decision::Allow)
        }
    }
}

fn require_role(caller: &Caller, kind: OperationKind) -> Result<(), PolicyError> {
    if kind.allowed_roles().contains(&caller.role) {
        Ok(())
    } else {
        Err(PolicyError::NotAuthorized)
    }
}
