// src/main.rs
// DOCUMENTATION: Application entry point
// PURPOSE: Resolve configuration, initialize the database pool, and park
// until shutdown

use dotenv::dotenv;
use std::process;

use skyrimgrade::{AppSettings, Database};

#[tokio::main]
async fn main() {
    // 1. Load environment variables
    dotenv().ok();

    // 2. Resolve and validate configuration
    let settings = match AppSettings::load() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            process::exit(1);
        }
    };

    // 3. Initialize logging from the resolved level unless RUST_LOG overrides
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", settings.logging_level.to_lowercase());
    }
    env_logger::init();

    log::info!(
        "Starting {} {} in {} mode...",
        settings.app_name,
        settings.app_version,
        settings.environment
    );
    log::info!("Configuration loaded: {:?}", settings);
    log::info!("Log file path: {}", settings.logging_file_path);

    // 4. Initialize database connection pool
    let db = Database::new();
    let pool = match db.initialize(&settings).await {
        Ok(pool) => pool,
        Err(e) => {
            log::error!("Failed to initialize database pool: {e}");
            process::exit(1);
        }
    };

    // 5. Startup health check
    if pool.is_healthy().await {
        log::info!("Database health check passed: {}", pool.stats());
    } else {
        log::warn!("Database health check failed at startup");
    }

    // Migrations and the HTTP server are wired in by their own subsystems;
    // this binary only reports where they would bind.
    log::info!(
        "HTTP server would bind {}:{}",
        settings.server_host,
        settings.server_port
    );

    // 6. Park until shutdown is requested
    log::info!("Application is running. Press Ctrl+C to stop.");
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for shutdown signal: {e}");
    }

    // 7. Orderly shutdown
    db.shutdown().await;
    log::info!("Shutdown complete");
}
