//! Test helpers for Web API integration tests.
//!
//! Provides a TestApp wrapping an in-memory database, a temporary blob
//! directory and an axum-test server.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::http::header::AUTHORIZATION;
use axum_test::TestServer;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::task::JoinHandle;

use filevault::config::Config;
use filevault::web::{AppState, WebServer};
use filevault::worker::WorkerStats;
use filevault::Database;

/// Default timeout for background work to settle.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// A running API with its collaborators.
pub struct TestApp {
    pub server: TestServer,
    pub state: Arc<AppState>,
    pub storage: TempDir,
    pub workers: Vec<JoinHandle<WorkerStats>>,
}

/// Create a test configuration rooted at `storage`.
pub fn create_test_config(storage: &TempDir) -> Config {
    let mut config = Config::default();
    config.server.host = "127.0.0.1".to_string();
    config.server.port = 0;
    config.files.storage_path = storage.path().to_string_lossy().into_owned();
    config.sessions.backend = "memory".to_string();
    config
}

/// Create a test app with an in-memory database and running workers.
pub async fn create_test_app() -> TestApp {
    let storage = TempDir::new().expect("Failed to create storage dir");
    let config = create_test_config(&storage);
    create_test_app_with_config(storage, &config).await
}

/// Create a test app from an explicit configuration.
pub async fn create_test_app_with_config(storage: TempDir, config: &Config) -> TestApp {
    let db = Database::open_in_memory()
        .await
        .expect("Failed to create test database");

    let (web, workers) = WebServer::new(config, db).expect("Failed to configure web server");
    let state = web.state();
    let server = TestServer::new(web.router()).expect("Failed to create test server");

    TestApp {
        server,
        state,
        storage,
        workers: workers.spawn(),
    }
}

/// `Authorization` header value for Basic credentials.
pub fn basic_auth(email: &str, password: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{email}:{password}")))
}

/// Base64 payload for an upload body.
pub fn encode_data(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Register a user and return the response body.
pub async fn register_user(server: &TestServer, email: &str, password: &str) -> Value {
    let response = server
        .post("/users")
        .json(&json!({
            "email": email,
            "password": password
        }))
        .await;

    response.assert_status(axum::http::StatusCode::CREATED);
    response.json::<Value>()
}

/// Open a session and return its token.
pub async fn connect(server: &TestServer, email: &str, password: &str) -> String {
    let response = server
        .get("/connect")
        .add_header(AUTHORIZATION, basic_auth(email, password))
        .await;

    response.assert_status_ok();
    response.json::<Value>()["token"]
        .as_str()
        .expect("token missing")
        .to_string()
}

/// Register a user, open a session and return its token.
pub async fn register_and_connect(server: &TestServer, email: &str, password: &str) -> String {
    register_user(server, email, password).await;
    connect(server, email, password).await
}

/// Upload a record and return the raw response.
pub async fn upload(server: &TestServer, token: &str, body: Value) -> axum_test::TestResponse {
    server
        .post("/files")
        .add_header("x-token", token.to_string())
        .json(&body)
        .await
}

/// Upload a record, expect 201 and return the body.
pub async fn upload_ok(server: &TestServer, token: &str, body: Value) -> Value {
    let response = upload(server, token, body).await;
    response.assert_status(axum::http::StatusCode::CREATED);
    response.json::<Value>()
}

/// Create a folder and return its id.
pub async fn create_folder(server: &TestServer, token: &str, name: &str, parent: Value) -> String {
    let body = upload_ok(
        server,
        token,
        json!({ "name": name, "type": "folder", "parentId": parent }),
    )
    .await;
    body["id"].as_str().expect("id missing").to_string()
}

/// Encode a small PNG of the given dimensions.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    let mut out = std::io::Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png)
        .expect("Failed to encode png");
    out.into_inner()
}

/// Blob files currently in the storage directory.
pub fn stored_blobs(storage: &TempDir) -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(storage.path())
        .map(|entries| entries.filter_map(|e| e.ok()).map(|e| e.path()).collect())
        .unwrap_or_default();
    paths.sort();
    paths
}

/// Wait until `check` holds or the timeout elapses.
pub async fn wait_for<F: Fn() -> bool>(check: F) -> bool {
    let deadline = tokio::time::Instant::now() + DEFAULT_TIMEOUT;
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    check()
}
