//! Authentication error types.

use thiserror::Error;

use crate::claims::TokenValidationError;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Invalid Email or Password")]
    InvalidCredentials,

    #[error("token is invalid: {0}")]
    TokenInvalid(String),

    #[error(transparent)]
    TokenRejected(#[from] TokenValidationError),

    #[error("expected a {expected} token")]
    WrongTokenType { expected: &'static str },

    #[error("{token_type} token lifetime of {ttl_secs}s is out of range")]
    TokenLifetimeOutOfRange { token_type: &'static str, ttl_secs: u64 },

    #[error("password hashing failed: {0}")]
    Hashing(String),

    #[error("stored password hash is malformed")]
    InvalidHashFormat,
}
