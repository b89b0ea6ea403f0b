//! `orgdir-directory` — the directory's records and their validation rules.
//!
//! Pure data: no storage, no HTTP. Payload types (`New*`, `*Patch`) validate
//! themselves and produce records that stores persist verbatim.

pub mod group;
pub mod organization;
pub mod user;

pub use group::Group;
pub use organization::{NewOrganization, Organization, OrganizationPatch};
pub use user::{NewUser, User, UserDraft, UserPatch, normalize_email};

/// Maximum length of a phone number, in characters.
pub const PHONE_MAX_LEN: usize = 15;

/// Maximum length of a name or email, in characters.
pub const NAME_MAX_LEN: usize = 255;
