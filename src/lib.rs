//! PC Power Catalog - CPU/GPU/PSU power data scraper and API
//!
//! Scrapes heterogeneous hardware catalogs into SQLite (static HTML, discovered JSON
//! endpoints, or a headless browser as the last resort) and serves the result over HTTP.

// Module declarations
pub mod api;
pub mod application;
pub mod domain;
pub mod infrastructure;

use actix_web::{App, HttpServer, web};
use anyhow::Context;
use tracing::info;

use crate::application::state::AppState;
use crate::infrastructure::config::ConfigManager;
use crate::infrastructure::logging::{init_logging_with_config, log_system_info};

/// Load configuration, open the database, kick off a stale-catalog refresh and serve the API
pub async fn run() -> anyhow::Result<()> {
    let manager = ConfigManager::new()?;
    let loaded = manager.initialize_on_first_run().await?;

    init_logging_with_config(&loaded.config.logging)?;
    log_system_info();
    loaded.log_warnings();
    let config = loaded.config;

    let bind_address = config.server.bind_address();
    let state = web::Data::new(AppState::from_config(config).await?);

    if state.update_on_startup().await {
        info!("Background update started; serving existing data meanwhile");
    }

    info!("🌍 Serving PC Components API on http://{}", bind_address);
    let app_state = state.clone();
    HttpServer::new(move || App::new().app_data(app_state.clone()).configure(api::configure))
        .bind(&bind_address)
        .with_context(|| format!("Failed to bind {bind_address}"))?
        .run()
        .await
        .context("HTTP server failed")?;

    info!("Server stopped");
    Ok(())
}
