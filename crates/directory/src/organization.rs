use serde::{Deserialize, Serialize};

use orgdir_core::{DomainError, DomainResult, Entity, OrganizationId};

use crate::{NAME_MAX_LEN, PHONE_MAX_LEN};

/// A tenant. Users belong to exactly one organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    pub id: OrganizationId,
    pub name: String,
    pub phone: String,
    pub address: String,
}

impl Entity for Organization {
    type Id = OrganizationId;

    fn id(&self) -> OrganizationId {
        self.id
    }
}

/// Payload for creating an organization. Every field is optional and
/// defaults to the empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewOrganization {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

impl NewOrganization {
    pub fn into_organization(self, id: OrganizationId) -> DomainResult<Organization> {
        let org = Organization {
            id,
            name: self.name.map(|n| n.trim().to_string()).unwrap_or_default(),
            phone: self.phone.map(|p| p.trim().to_string()).unwrap_or_default(),
            address: self.address.unwrap_or_default(),
        };
        check_lengths(&org.name, &org.phone)?;
        Ok(org)
    }
}

/// Partial update of an organization; `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrganizationPatch {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

impl OrganizationPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.phone.is_none() && self.address.is_none()
    }

    /// Apply onto `org`, validating the result before anything is written.
    pub fn apply_to(self, org: &Organization) -> DomainResult<Organization> {
        let mut next = org.clone();
        if let Some(name) = self.name {
            next.name = name.trim().to_string();
        }
        if let Some(phone) = self.phone {
            next.phone = phone.trim().to_string();
        }
        if let Some(address) = self.address {
            next.address = address;
        }
        check_lengths(&next.name, &next.phone)?;
        Ok(next)
    }
}

fn check_lengths(name: &str, phone: &str) -> DomainResult<()> {
    if name.chars().count() > NAME_MAX_LEN {
        return Err(DomainError::validation(format!(
            "name: ensure this field has no more than {NAME_MAX_LEN} characters"
        )));
    }
    if phone.chars().count() > PHONE_MAX_LEN {
        return Err(DomainError::validation(format!(
            "phone: ensure this field has no more than {PHONE_MAX_LEN} characters"
        )));
    }
    Ok(())
}
