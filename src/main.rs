use std::time::Duration;

use tracing::{error, info};

use filevault::web::WebServer;
use filevault::{Config, Database};

const WORKER_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() {
    // Load configuration
    let config = match Config::load_with_env("config.toml") {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config.toml: {e}");
            eprintln!("Using default configuration.");
            let mut config = Config::default();
            config.apply_env_overrides();
            config
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Invalid configuration: {e}");
        std::process::exit(1);
    }

    // Initialize logging
    if let Err(e) = filevault::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        // Fall back to console-only logging
        filevault::logging::init_console_only(&config.logging.level);
    }

    info!("filevault - file storage API");

    let db = match Database::open(&config.database.path).await {
        Ok(db) => db,
        Err(e) => {
            error!("Failed to open database {}: {}", config.database.path, e);
            std::process::exit(1);
        }
    };

    let (server, workers) = match WebServer::new(&config, db.clone()) {
        Ok(parts) => parts,
        Err(e) => {
            error!("Failed to configure web server: {}", e);
            std::process::exit(1);
        }
    };
    let worker_handles = workers.spawn();

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {}", e);
        }
        info!("Shutdown signal received");
    };

    if let Err(e) = server.run(shutdown).await {
        error!("Web server error: {}", e);
    }

    // Queue producers are gone once the server is dropped; drain the workers.
    for handle in worker_handles {
        match tokio::time::timeout(WORKER_DRAIN_TIMEOUT, handle).await {
            Ok(Ok(stats)) => info!(
                completed = stats.completed,
                failed = stats.failed,
                "Worker drained"
            ),
            Ok(Err(e)) => error!("Worker task failed: {}", e),
            Err(_) => error!("Worker did not drain in time"),
        }
    }

    db.close().await;
    info!("Bye");
}
