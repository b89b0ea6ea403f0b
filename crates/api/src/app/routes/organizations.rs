use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};

use orgdir_core::{OrganizationId, UserId};

use crate::app::routes::common::{json_body, parse_id};
use crate::app::services::DirectoryService;
use crate::app::{dto, errors};
use crate::context::CallerContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_organizations).post(create_organization))
        .route(
            "/:id",
            get(get_organization)
                .patch(update_organization)
                .delete(delete_organization),
        )
        .route("/:id/users", get(list_organization_users))
        .route("/:id/users/:user_id", get(get_organization_user))
}

pub async fn list_organizations(
    Extension(services): Extension<Arc<DirectoryService>>,
    Extension(ctx): Extension<CallerContext>,
) -> Response {
    match services.list_organizations(ctx.caller()).await {
        Ok(orgs) => {
            let items = orgs.into_iter().map(dto::organization_to_json).collect::<Vec<_>>();
            (StatusCode::OK, Json(items)).into_response()
        }
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn create_organization(
    Extension(services): Extension<Arc<DirectoryService>>,
    Extension(ctx): Extension<CallerContext>,
    payload: Result<Json<dto::OrganizationRequest>, JsonRejection>,
) -> Response {
    let body = match json_body(payload) {
        Ok(b) => b,
        Err(resp) => return resp,
    };

    match services.create_organization(ctx.caller(), body.into()).await {
        Ok(org) => (StatusCode::CREATED, Json(dto::organization_to_json(org))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_organization(
    Extension(services): Extension<Arc<DirectoryService>>,
    Extension(ctx): Extension<CallerContext>,
    Path(id): Path<String>,
) -> Response {
    let id = match parse_id::<OrganizationId>(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.get_organization(ctx.caller(), id).await {
        Ok(org) => (StatusCode::OK, Json(dto::organization_to_json(org))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn update_organization(
    Extension(services): Extension<Arc<DirectoryService>>,
    Extension(ctx): Extension<CallerContext>,
    Path(id): Path<String>,
    payload: Result<Json<dto::OrganizationRequest>, JsonRejection>,
) -> Response {
    let id = match parse_id::<OrganizationId>(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let body = match json_body(payload) {
        Ok(b) => b,
        Err(resp) => return resp,
    };

    match services.update_organization(ctx.caller(), id, body.into()).await {
        Ok(org) => (StatusCode::OK, Json(dto::organization_to_json(org))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn delete_organization(
    Extension(services): Extension<Arc<DirectoryService>>,
    Extension(ctx): Extension<CallerContext>,
    Path(id): Path<String>,
) -> Response {
    let id = match parse_id::<OrganizationId>(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.delete_organization(ctx.caller(), id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn list_organization_users(
    Extension(services): Extension<Arc<DirectoryService>>,
    Extension(ctx): Extension<CallerContext>,
    Path(id): Path<String>,
) -> Response {
    let id = match parse_id::<OrganizationId>(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.list_organization_users(ctx.caller(), id).await {
        Ok(users) => {
            let items = users.into_iter().map(dto::minimal_user_to_json).collect::<Vec<_>>();
            (StatusCode::OK, Json(items)).into_response()
        }
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_organization_user(
    Extension(services): Extension<Arc<DirectoryService>>,
    Extension(ctx): Extension<CallerContext>,
    Path((org_id, user_id)): Path<(String, String)>,
) -> Response {
    let org_id = match parse_id::<OrganizationId>(&org_id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let user_id = match parse_id::<UserId>(&user_id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.get_organization_user(ctx.caller(), org_id, user_id).await {
        Ok(user) => (StatusCode::OK, Json(dto::minimal_user_to_json(user))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
