use std::sync::Arc;
use tracing::info;

use rango::{app, config::Config, search::SearchGateway, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = Config::from_env();

    info!("Starting Rango");
    info!("Search endpoint: {}", config.search_url);
    info!("Search key file: {}", config.search_key_path.display());

    let http_client = SearchGateway::http_client(config.search_timeout)?;
    let state = Arc::new(AppState::new(&config, http_client));

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    info!("Rango listening on http://{}", config.addr);

    axum::serve(listener, app(state)).await?;

    Ok(())
}
