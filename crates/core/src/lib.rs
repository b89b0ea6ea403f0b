//! Ids and input errors shared by every orgdir crate.

pub mod entity;
pub mod error;
pub mod id;

pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{OrganizationId, UserId};
