use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::app::routes::common::json_body;
use crate::app::services::DirectoryService;
use crate::app::{dto, errors};
use crate::context::CallerContext;

pub async fn login(
    Extension(services): Extension<Arc<DirectoryService>>,
    payload: Result<Json<dto::LoginRequest>, JsonRejection>,
) -> Response {
    let body = match json_body(payload) {
        Ok(b) => b,
        Err(resp) => return resp,
    };

    match services.login(body.email.as_deref(), body.password.as_deref()).await {
        Ok(pair) => (StatusCode::OK, Json(pair)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn refresh(
    Extension(services): Extension<Arc<DirectoryService>>,
    payload: Result<Json<dto::RefreshRequest>, JsonRejection>,
) -> Response {
    let body = match json_body(payload) {
        Ok(b) => b,
        Err(resp) => return resp,
    };

    match services.refresh(&body.refresh).await {
        Ok(access) => (StatusCode::OK, Json(json!({ "access": access }))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn list_groups(
    Extension(services): Extension<Arc<DirectoryService>>,
    Extension(ctx): Extension<CallerContext>,
) -> Response {
    match services.list_groups(ctx.caller()).await {
        Ok(groups) => {
            let items = groups.into_iter().map(dto::group_to_json).collect::<Vec<_>>();
            (StatusCode::OK, Json(items)).into_response()
        }
        Err(e) => errors::service_error_to_response(e),
    }
}
