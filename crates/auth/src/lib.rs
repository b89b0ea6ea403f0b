//! `orgdir-auth` — authentication and authorization boundary.
//!
//! Password hashing, JWT issuance/verification and the role policy. This crate
//! is intentionally decoupled from HTTP and storage: the API layer loads
//! records and asks [`policy::check`] for a decision.

pub mod caller;
pub mod claims;
pub mod config;
pub mod error;
pub mod password;
pub mod policy;
pub mod roles;
pub mod token;

pub use caller::Caller;
pub use claims::{JwtClaims, TokenType, TokenValidationError, validate_claims};
pub use config::AuthConfig;
pub use error::AuthError;
pub use password::PasswordHasher;
pub use policy::{
    Decision, DenialKind, Operation, OperationKind, PolicyError, UserTarget, Visibility, check,
};
pub use roles::{InvalidRole, Role};
pub use token::{TokenCodec, TokenPair};
