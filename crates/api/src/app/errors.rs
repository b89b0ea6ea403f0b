use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;
use thiserror::Error;

use orgdir_auth::{AuthError, DenialKind, PolicyError};
use orgdir_core::DomainError;
use orgdir_infra::{IpLookupError, StoreError};

/// Everything a directory operation can fail with, already classified by
/// how it is reported to the client.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error(transparent)]
    Policy(#[from] PolicyError),

    #[error("{0}")]
    Validation(String),

    #[error("Not found.")]
    NotFound,

    #[error("{0}")]
    Unauthorized(String),

    #[error("Invalid Email or Password")]
    InvalidCredentials,

    #[error("{0}")]
    IpLookup(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateEmail => ServiceError::Policy(PolicyError::DuplicateEmail),
            StoreError::UnknownOrganization(id) => {
                ServiceError::Validation(format!("organization: organization {id} does not exist"))
            }
            StoreError::NotFound => ServiceError::NotFound,
            StoreError::UnknownGroup(_) | StoreError::Storage(_) => ServiceError::Internal(err.to_string()),
        }
    }
}

impl From<DomainError> for ServiceError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(msg) | DomainError::InvalidId(msg) => ServiceError::Validation(msg),
        }
    }
}

impl From<AuthError> for ServiceError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => ServiceError::InvalidCredentials,
            AuthError::TokenInvalid(_) | AuthError::TokenRejected(_) | AuthError::WrongTokenType { .. } => {
                ServiceError::Unauthorized(err.to_string())
            }
            AuthError::Hashing(_) | AuthError::InvalidHashFormat | AuthError::TokenLifetimeOutOfRange { .. } => {
                ServiceError::Internal(err.to_string())
            }
        }
    }
}

impl From<IpLookupError> for ServiceError {
    fn from(err: IpLookupError) -> Self {
        ServiceError::IpLookup(err.0)
    }
}

pub fn service_error_to_response(err: ServiceError) -> axum::response::Response {
    match err {
        ServiceError::Policy(e) => match e.kind() {
            DenialKind::Forbidden => json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string()),
            DenialKind::BadRequest => json_error(StatusCode::BAD_REQUEST, "duplicate_email", e.to_string()),
            DenialKind::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", e.to_string()),
        },
        ServiceError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        ServiceError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "Not found."),
        ServiceError::Unauthorized(msg) => json_error(StatusCode::UNAUTHORIZED, "unauthorized", msg),
        ServiceError::InvalidCredentials => json_error(
            StatusCode::BAD_REQUEST,
            "invalid_credentials",
            "Invalid Email or Password",
        ),
        ServiceError::IpLookup(msg) => json_error(StatusCode::BAD_REQUEST, "ip_lookup_failed", msg),
        ServiceError::Internal(msg) => {
            tracing::error!(error = %msg, "internal error");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", "internal error")
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> axum::response::Response {
        service_error_to_response(self)
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use orgdir_core::OrganizationId;

    #[test]
    fn duplicate_email_from_store_reads_like_the_policy_denial() {
        let err = ServiceError::from(StoreError::DuplicateEmail);
        assert_eq!(err, ServiceError::Policy(PolicyError::DuplicateEmail));
        assert_eq!(err.to_string(), "User with this email already exists");
    }

    #[test]
    fn unknown_organization_is_a_validation_error() {
        let err = ServiceError::from(StoreError::UnknownOrganization(OrganizationId::new()));
        assert!(matches!(err, ServiceError::Validation(m) if m.starts_with("organization")));
    }

    #[test]
    fn status_codes_follow_the_error_class() {
        let cases = [
            (ServiceError::Policy(PolicyError::NotAuthorized), StatusCode::FORBIDDEN),
            (ServiceError::Policy(PolicyError::DuplicateEmail), StatusCode::BAD_REQUEST),
            (ServiceError::Policy(PolicyError::NotFound), StatusCode::NOT_FOUND),
            (ServiceError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (ServiceError::Unauthorized("x".into()), StatusCode::UNAUTHORIZED),
            (ServiceError::InvalidCredentials, StatusCode::BAD_REQUEST),
            (ServiceError::IpLookup("x".into()), StatusCode::BAD_REQUEST),
            (ServiceError::Internal("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(service_error_to_response(err).status(), status);
        }
    }

    #[test]
    fn token_failures_are_unauthorized() {
        let err = ServiceError::from(AuthError::WrongTokenType { expected: "access" });
        assert!(matches!(err, ServiceError::Unauthorized(_)));
        let err = ServiceError::from(AuthError::InvalidHashFormat);
        assert!(matches!(err, ServiceError::Internal(_)));
        let err = ServiceError::from(AuthError::TokenLifetimeOutOfRange {
            token_type: "access",
            ttl_secs: u64::MAX,
        });
        assert_eq!(service_error_to_response(err).status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
