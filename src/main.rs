//! Patient registry
//!
//! Main entry point for the patient registry HTTP service.

use actix_web::{web, App, HttpServer};
use anyhow::Context;
use patient_registry::db::PatientStore;
use patient_registry::registry::PatientRegistry;
use patient_registry::{api, config, telemetry};
use tracing::info;
use tracing_actix_web::TracingLogger;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    // Load configuration
    let config = config::load_config().context("failed to load configuration")?;

    // Initialize logger
    telemetry::init(&config.log)?;

    // Open the patients file
    let store = PatientStore::open(&config.storage)
        .await
        .with_context(|| format!("failed to open {}", config.storage.path.display()))?;
    let registry = web::Data::new(PatientRegistry::new(store));

    info!(
        host = %config.server.host,
        port = config.server.port,
        storage = %config.storage.path.display(),
        "starting patient registry"
    );

    // Start HTTP server
    HttpServer::new(move || {
        App::new()
            // Add app state
            .app_data(registry.clone())
            // Request spans
            .wrap(TracingLogger::default())
            // API routes
            .configure(api::configure)
    })
    .bind((config.server.host.as_str(), config.server.port))?
    .run()
    .await?;

    Ok(())
}
