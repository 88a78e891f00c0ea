//! Web server for filevault.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;

use crate::auth::{session_store_from_config, SessionManager};
use crate::config::Config;
use crate::file::{BlobStore, FileService};
use crate::worker::{channel, Workers, THUMBNAIL_QUEUE, WELCOME_QUEUE};
use crate::{Database, Result, VaultError};

use super::handlers::AppState;
use super::router::create_router;

/// Session purge interval: 1 hour.
const SESSION_PURGE_INTERVAL_SECS: u64 = 3600;

/// Web server for the API.
pub struct WebServer {
    /// Server address.
    addr: SocketAddr,
    /// Application state.
    app_state: Arc<AppState>,
    /// CORS allowed origins.
    cors_origins: Vec<String>,
    /// Maximum decoded upload size.
    max_upload_bytes: usize,
}

impl WebServer {
    /// Create a new web server and the workers consuming its queues.
    ///
    /// The workers are returned unspawned so the caller decides where they
    /// run.
    pub fn new(config: &Config, db: Database) -> Result<(Self, Workers)> {
        let addr = format!("{}:{}", config.server.host, config.server.port)
            .parse()
            .map_err(|e| VaultError::Config(format!("invalid server address: {e}")))?;

        let (thumbnail_queue, thumbnail_rx) = channel(THUMBNAIL_QUEUE);
        let (welcome_queue, welcome_rx) = channel(WELCOME_QUEUE);

        let store = session_store_from_config(&config.sessions, &db)?;
        let sessions = SessionManager::new(
            db.clone(),
            store,
            Duration::from_secs(config.sessions.ttl_secs),
        );

        let max_upload_bytes = config.files.max_upload_bytes();
        let files = FileService::new(
            db.clone(),
            BlobStore::new(&config.files.storage_path),
            thumbnail_queue,
        )
        .with_max_file_size(max_upload_bytes);

        tracing::info!(
            storage_path = %config.files.storage_path,
            session_backend = %config.sessions.backend,
            "Web server configured"
        );

        let workers = Workers::new(
            db.clone(),
            thumbnail_rx,
            welcome_rx,
            config.thumbnails.max_attempts,
        );

        let server = Self {
            addr,
            app_state: Arc::new(AppState::new(db, sessions, files, welcome_queue)),
            cors_origins: config.server.cors_origins.clone(),
            max_upload_bytes,
        };

        Ok((server, workers))
    }

    /// Get the server address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Shared application state.
    pub fn state(&self) -> Arc<AppState> {
        self.app_state.clone()
    }

    /// Build the router without binding a socket.
    pub fn router(&self) -> Router {
        create_router(
            self.app_state.clone(),
            &self.cors_origins,
            self.max_upload_bytes,
        )
    }

    /// Start the session purge background task.
    fn start_session_purge_task(sessions: SessionManager) {
        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(Duration::from_secs(SESSION_PURGE_INTERVAL_SECS));

            // Skip the first immediate tick
            interval.tick().await;

            loop {
                interval.tick().await;

                match sessions.purge_expired().await {
                    Ok(count) if count > 0 => {
                        tracing::info!(deleted_count = count, "Purged expired sessions");
                    }
                    Ok(_) => tracing::debug!("No expired sessions to purge"),
                    Err(e) => tracing::warn!(error = %e, "Failed to purge sessions"),
                }
            }
        });
    }

    /// Run the web server until `shutdown` resolves.
    pub async fn run<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let router = self.router();

        let listener = TcpListener::bind(self.addr).await?;
        let local_addr = listener.local_addr()?;

        Self::start_session_purge_task(self.app_state.sessions.clone());
        tracing::info!("Web server listening on http://{}", local_addr);

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("Web server stopped");
        Ok(())
    }

    /// Run the server in the background and return the actual bound address.
    ///
    /// This is useful for testing when binding to port 0.
    pub async fn run_with_addr(self) -> Result<SocketAddr> {
        let router = self.router();

        let listener = TcpListener::bind(self.addr).await?;
        let local_addr = listener.local_addr()?;

        Self::start_session_purge_task(self.app_state.sessions.clone());
        tracing::info!("Web server listening on http://{}", local_addr);

        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router).await {
                tracing::error!("Web server error: {}", e);
            }
        });

        Ok(local_addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    fn create_test_config(storage: &TempDir) -> Config {
        let mut config = Config::default();
        config.server.host = "127.0.0.1".to_string();
        config.server.port = 0; // Use random port
        config.files.storage_path = storage.path().to_string_lossy().into_owned();
        config.sessions.backend = "memory".to_string();
        config
    }

    #[tokio::test]
    async fn test_web_server_new() {
        let storage = TempDir::new().unwrap();
        let config = create_test_config(&storage);
        let db = Database::open_in_memory().await.unwrap();

        let (server, _workers) = WebServer::new(&config, db).unwrap();
        assert_eq!(server.addr().ip().to_string(), "127.0.0.1");
    }

    #[tokio::test]
    async fn test_web_server_rejects_bad_address() {
        let storage = TempDir::new().unwrap();
        let mut config = create_test_config(&storage);
        config.server.host = "not an address".to_string();
        let db = Database::open_in_memory().await.unwrap();

        let result = WebServer::new(&config, db);
        assert!(matches!(result, Err(VaultError::Config(_))));
    }

    #[tokio::test]
    async fn test_web_server_rejects_unknown_session_backend() {
        let storage = TempDir::new().unwrap();
        let mut config = create_test_config(&storage);
        config.sessions.backend = "redis".to_string();
        let db = Database::open_in_memory().await.unwrap();

        assert!(WebServer::new(&config, db).is_err());
    }

    #[tokio::test]
    async fn test_web_server_run() {
        let storage = TempDir::new().unwrap();
        let config = create_test_config(&storage);
        let db = Database::open_in_memory().await.unwrap();

        let (server, _workers) = WebServer::new(&config, db).unwrap();
        let addr = server.run_with_addr().await.unwrap();

        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET /status HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();

        assert!(response.starts_with("HTTP/1.1 200"));
        assert!(response.contains(r#""db":true"#));
        assert!(response.contains(r#""sessions":true"#));
    }
}
