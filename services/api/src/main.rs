mod config;
mod http;
mod store;

use crate::config::Config;
use anyhow::Context;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use tracing_subscriber::fmt::time::ChronoLocal;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("Failed to load application configuration")?;

    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(ChronoLocal::rfc_3339())
        .init();

    if config.report_generator_url.is_none() {
        info!("REPORT_GENERATOR_URL not set; report generation is disabled");
    }

    // Configure a permissive CORS policy so a separate frontend can call the API.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = http::create_router(http::AppState::new(config.report_generator_url.clone()))
        .layer(cors);

    info!("Starting session store, listening on {}", config.bind_address);
    let listener = tokio::net::TcpListener::bind(config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
