use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};

use orgdir_core::UserId;

use crate::app::routes::common::{json_body, parse_id};
use crate::app::services::DirectoryService;
use crate::app::{dto, errors};
use crate::context::CallerContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/:id", get(get_user).patch(update_user).delete(delete_user))
}

pub async fn list_users(
    Extension(services): Extension<Arc<DirectoryService>>,
    Extension(ctx): Extension<CallerContext>,
    Query(query): Query<dto::UserListQuery>,
) -> Response {
    match services.list_users(ctx.caller(), query.search, query.phone).await {
        Ok(records) => {
            let items = records.into_iter().map(dto::user_to_json).collect::<Vec<_>>();
            (StatusCode::OK, Json(items)).into_response()
        }
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn create_user(
    Extension(services): Extension<Arc<DirectoryService>>,
    Extension(ctx): Extension<CallerContext>,
    payload: Result<Json<dto::CreateUserRequest>, JsonRejection>,
) -> Response {
    let body = match json_body(payload) {
        Ok(b) => b,
        Err(resp) => return resp,
    };

    match services.create_user(ctx.caller(), body.into()).await {
        Ok(record) => (StatusCode::CREATED, Json(dto::user_to_json(record))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_user(
    Extension(services): Extension<Arc<DirectoryService>>,
    Extension(ctx): Extension<CallerContext>,
    Path(id): Path<String>,
) -> Response {
    let id = match parse_id::<UserId>(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.get_user(ctx.caller(), id).await {
        Ok(record) => (StatusCode::OK, Json(dto::user_to_json(record))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn update_user(
    Extension(services): Extension<Arc<DirectoryService>>,
    Extension(ctx): Extension<CallerContext>,
    Path(id): Path<String>,
    payload: Result<Json<dto::UpdateUserRequest>, JsonRejection>,
) -> Response {
    let id = match parse_id::<UserId>(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let body = match json_body(payload) {
        Ok(b) => b,
        Err(resp) => return resp,
    };

    let (patch, password) = body.into_parts();
    match services.update_user(ctx.caller(), id, patch, password).await {
        Ok(record) => (StatusCode::OK, Json(dto::user_to_json(record))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn delete_user(
    Extension(services): Extension<Arc<DirectoryService>>,
    Extension(ctx): Extension<CallerContext>,
    Path(id): Path<String>,
) -> Response {
    let id = match parse_id::<UserId>(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.delete_user(ctx.caller(), id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
