use anyhow::Context as _;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    orgdir_observability::init();

    let mut config = orgdir_api::ApiConfig::from_env()?;
    if std::env::args().skip(1).any(|arg| arg == "--seed") {
        config.seed_demo_data = true;
    }
    let bind_addr = config.bind_addr.clone();

    let app = orgdir_api::build_app(config).await?;

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
