use serde::Serialize;

use orgdir_core::{OrganizationId, UserId};

use crate::Role;

/// The authenticated identity executing a request.
///
/// Rebuilt on every request from the user record named by the token subject;
/// never persisted and never derived from token claims alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Caller {
    pub id: UserId,
    pub role: Role,
    pub organization_id: OrganizationId,
    pub email: String,
}

impl Caller {
    pub fn new(
        id: UserId,
        role: Role,
        organization_id: OrganizationId,
        email: impl Into<String>,
    ) -> Self {
        Self {
            id,
            role,
            organization_id,
            email: email.into(),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}
