use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};

use crate::app::errors::{self, ServiceError};
use crate::app::services::DirectoryService;
use crate::context::CallerContext;

#[derive(Clone)]
pub struct AuthState {
    pub directory: Arc<DirectoryService>,
}

/// Resolve the bearer token to a [`CallerContext`] or answer 401.
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, Response> {
    let token = extract_bearer(req.headers()).map_err(|e| {
        errors::json_error(StatusCode::UNAUTHORIZED, "unauthorized", e)
    })?;

    let caller = state.directory.authenticate(token).await.map_err(|e| {
        tracing::debug!(error = %e, "rejected bearer token");
        match e {
            ServiceError::Unauthorized(_) => {
                errors::json_error(StatusCode::UNAUTHORIZED, "unauthorized", "invalid or expired token")
            }
            other => errors::service_error_to_response(other),
        }
    })?;

    req.extensions_mut().insert(CallerContext::new(caller));

    Ok(next.run(req).await)
}

fn extract_bearer(headers: &HeaderMap) -> Result<&str, &'static str> {
    let header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or("missing Authorization header")?;

    let header = header.to_str().map_err(|_| "malformed Authorization header")?;

    let header = header
        .strip_prefix("Bearer ")
        .ok_or("expected a Bearer token")?;

    let token = header.trim();
    if token.is_empty() {
        return Err("expected a Bearer token");
    }

    Ok(token)
}
