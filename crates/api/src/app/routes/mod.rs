use axum::{
    Router,
    routing::{get, post},
};

pub mod auth;
pub mod common;
pub mod organizations;
pub mod system;
pub mod users;

/// Router for endpoints reachable without a token.
pub fn public_router() -> Router {
    Router::new()
        .route("/health", get(system::health))
        .route("/auth/login", post(auth::login))
        .route("/auth/token/refresh", post(auth::refresh))
}

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/auth/groups", get(auth::list_groups))
        .route("/info", get(system::info))
        .nest("/users", users::router())
        .nest("/organizations", organizations::router())
}
