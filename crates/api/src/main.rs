use anyhow::Context;

use carbonledger_infra::Settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    carbonledger_observability::init();

    let settings = Settings::from_env().context("invalid configuration")?;
    let bind_addr = settings.bind_addr;
    tracing::info!(
        app = %settings.app_name,
        environment = %settings.environment,
        persistent = !matches!(settings.storage, carbonledger_infra::StorageBackend::InMemory),
        "starting"
    );

    let app = carbonledger_api::app::build_app(settings).await?;

    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
