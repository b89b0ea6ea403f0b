use std::sync::Arc;

use axum::{
    Json,
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::app::errors;
use crate::app::services::DirectoryService;
use crate::context::CallerContext;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

/// Caller name, id, organization and the service's public IP.
pub async fn info(
    Extension(services): Extension<Arc<DirectoryService>>,
    Extension(ctx): Extension<CallerContext>,
) -> Response {
    match services.info(ctx.caller()).await {
        Ok(info) => (StatusCode::OK, Json(info)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
