//! Errors raised while turning untrusted input into directory values.

use thiserror::Error;

pub type DomainResult<T> = Result<T, DomainError>;

/// Input rejected before it reaches storage.
///
/// Messages are prefixed with the offending field (`"email: ..."`) and are
/// shown to clients as-is.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("{0}")]
    Validation(String),

    /// A path or body id that is not a UUID.
    #[error("{0}")]
    InvalidId(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }
}
