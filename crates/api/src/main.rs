use anyhow::Context;

use stockroute_infra::{AnyDatabase, AppConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env().context("invalid configuration")?;
    stockroute_observability::init(config.log_format);
    tracing::info!(?config, "starting stockroute-api");

    let db = AnyDatabase::from_config(&config)
        .await
        .context("failed to initialise storage")?;

    let app = stockroute_api::app::build_app(db, config.jwt_secret.clone(), config.token_ttl);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
