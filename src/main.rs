use anyhow::Context;
use calvificador::{config::Config, gemini::GeminiClient, routes};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;
    let client = GeminiClient::new(&config);
    let app = routes::router(client);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("could not bind {addr}"))?;

    info!("calvificador listening on http://localhost:{}", config.port);

    axum::serve(listener, app).await?;
    Ok(())
}
