//! Lending Desk Server
//!
//! REST API over the borrow lifecycle engine.

use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lending_desk::{
    api,
    config::AppConfig,
    repository::Repository,
    services::{clock::SystemClock, email::EmailService, Services},
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("lending_desk={},tower_http=debug", config.logging.level).into());

    let registry = tracing_subscriber::registry().with(filter);
    if config.logging.format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    tracing::info!("Starting Lending Desk v{}", env!("CARGO_PKG_VERSION"));

    let repository = match &config.storage.seed_file {
        Some(path) if std::path::Path::new(path).exists() => Repository::from_seed_file(path)?,
        Some(path) => {
            tracing::warn!("Seed file {} not found, starting with empty store", path);
            Repository::in_memory()
        }
        None => Repository::in_memory(),
    };

    let services = Services::new(
        repository,
        &config,
        Arc::new(EmailService::new(config.email.clone())),
        Arc::new(SystemClock),
    )?;

    let addr = SocketAddr::new(config.server.host.parse()?, config.server.port);

    let state = AppState {
        config: Arc::new(config),
        services: Arc::new(services),
    };

    let app = api::router(state);

    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
