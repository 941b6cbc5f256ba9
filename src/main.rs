use anyhow::Context;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod aqi;
mod cache;
mod config;
mod routes;
mod utils;

use aqi::waqi::WaqiClient;
use config::Config;
use routes::{create_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "aqi_proxy_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();

    if config.aqi_api_token.is_none() {
        tracing::warn!("AQI_API_TOKEN is blank; uncached lookups will fail");
    }

    let cache = aqi::init_cache(&config);
    let aqi_client =
        Arc::new(WaqiClient::new(&config, cache).context("failed to build upstream HTTP client")?);
    tracing::info!(
        "AQI cache holds up to {} entries for {:?}",
        aqi_client.cache().max_entries(),
        aqi_client.cache().ttl()
    );

    let addr = format!("0.0.0.0:{}", config.port);
    let config = Arc::new(config);

    let state = AppState { config, aqi_client };

    let app = create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    tracing::info!("AQI service listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
