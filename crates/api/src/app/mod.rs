//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: directory orchestration over the store, policy and token codec
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request/response DTOs and JSON mapping helpers
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use anyhow::Context as _;
use axum::{Extension, Router};
use tower::ServiceBuilder;

use orgdir_auth::{PasswordHasher, TokenCodec};
use orgdir_infra::{DirectoryStore, HttpIpLookup, InMemoryDirectoryStore, PostgresDirectoryStore, seed_demo_data};

use crate::config::ApiConfig;
use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

use services::DirectoryService;

/// Build the full HTTP router from configuration (public entrypoint used by `main.rs`).
///
/// Connects to Postgres and applies the schema when `DATABASE_URL` is
/// configured; otherwise the directory lives in memory. Seeds demo data when
/// asked to.
pub async fn build_app(config: ApiConfig) -> anyhow::Result<Router> {
    let store: Arc<dyn DirectoryStore> = match &config.database_url {
        Some(url) => {
            let store = PostgresDirectoryStore::connect(url)
                .await
                .context("failed to connect to Postgres")?;
            store.migrate().await.context("failed to apply directory schema")?;
            tracing::info!("using Postgres directory store");
            Arc::new(store)
        }
        None => {
            tracing::info!("using in-memory directory store");
            Arc::new(InMemoryDirectoryStore::new())
        }
    };

    let hasher = PasswordHasher::new();
    if config.seed_demo_data {
        seed_demo_data(store.as_ref(), &hasher)
            .await
            .context("failed to seed demo data")?;
    }

    let services = DirectoryService::new(store, TokenCodec::new(config.auth))
        .with_hasher(hasher)
        .with_ip_lookup(Arc::new(HttpIpLookup::new(config.ip_lookup_url)))
        .with_group_link_failure(config.group_link_failure);

    Ok(build_app_with(Arc::new(services)))
}

/// Build the router around an already wired service (tests use this with an
/// in-memory store).
pub fn build_app_with(services: Arc<DirectoryService>) -> Router {
    let auth_state = middleware::AuthState {
        directory: services.clone(),
    };

    // Protected routes: require a valid access token.
    let protected = routes::router().layer(axum::middleware::from_fn_with_state(
        auth_state,
        middleware::auth_middleware,
    ));

    Router::new()
        .merge(routes::public_router())
        .merge(protected)
        .layer(Extension(services))
        .layer(ServiceBuilder::new())
}
