use anyhow::Context;

/// Bind address when `SMBRIDGE_BIND` is unset.
const DEFAULT_BIND: &str = "0.0.0.0:8080";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    smbridge_observability::init();

    let settings = smbridge_infra::settings::load_from_env()?;
    let bind = std::env::var("SMBRIDGE_BIND").unwrap_or_else(|_| DEFAULT_BIND.to_string());

    let app = smbridge_api::app::build_app(settings);

    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("failed to bind {bind}"))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
