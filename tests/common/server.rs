//! Test server lifecycle management
//!
//! This module manages spawning and shutting down test HTTP servers.
//! Each test gets an isolated server with its own fake catalog and database.

use super::constants::*;
use super::fake_catalog::FakeCatalog;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tune_neutral_server::catalog_client::{CatalogClientFactory, SpotifyClientFactory};
use tune_neutral_server::kv_store::SqliteKvStore;
use tune_neutral_server::server::{make_app, RequestsLoggingLevel, ServerConfig};
use tune_neutral_server::tune::{TuneService, TuneServiceConfig};
use tune_neutral_server::tune_store::TuneStore;

/// Test server instance with isolated catalog and database
///
/// When dropped, the server gracefully shuts down and temp resources are cleaned up.
pub struct TestServer {
    /// Base URL for making requests (e.g., "http://127.0.0.1:12345")
    pub base_url: String,

    /// The port the server is listening on
    pub port: u16,

    /// Fake catalog the server talks to
    pub catalog: FakeCatalog,

    // Private fields - keep resources alive until drop
    _temp_db_dir: TempDir,
    _shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestServer {
    /// Spawns a new test server on a random port
    ///
    /// # Panics
    ///
    /// Panics if the database cannot be created, port binding fails or the
    /// server doesn't become ready within timeout.
    pub async fn spawn() -> Self {
        let catalog = FakeCatalog::spawn().await;

        let temp_db_dir = TempDir::new().expect("Failed to create temp dir");
        let kv_store = Arc::new(
            SqliteKvStore::new(temp_db_dir.path().join("tune.db"))
                .expect("Failed to open tune database"),
        );
        let tune_service = Arc::new(TuneService::new(
            TuneStore::new(kv_store),
            TuneServiceConfig::default(),
        ));
        let factory: Arc<dyn CatalogClientFactory> = Arc::new(
            SpotifyClientFactory::new(&catalog.base_url, 5, Duration::ZERO)
                .expect("Failed to create catalog client factory"),
        );

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");

        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();

        let base_url = format!("http://127.0.0.1:{}", port);

        // Create shutdown channel
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        let config = ServerConfig {
            port,
            requests_logging_level: RequestsLoggingLevel::None,
            ..ServerConfig::default()
        };
        let app = make_app(config, tune_service, factory);

        // Spawn server in background task with graceful shutdown
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .expect("Server failed");
        });

        let server = Self {
            base_url,
            port,
            catalog,
            _temp_db_dir: temp_db_dir,
            _shutdown_tx: Some(shutdown_tx),
        };

        server.wait_for_ready().await;

        server
    }

    /// Waits for the server to become ready by polling the home endpoint
    async fn wait_for_ready(&self) {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .expect("Failed to build reqwest client");

        let start = std::time::Instant::now();
        let timeout = Duration::from_millis(SERVER_READY_TIMEOUT_MS);

        loop {
            if start.elapsed() > timeout {
                panic!(
                    "Server did not become ready within {}ms",
                    SERVER_READY_TIMEOUT_MS
                );
            }

            match client.get(format!("{}/", self.base_url)).send().await {
                Ok(response) if response.status().is_success() => return,
                _ => {
                    tokio::time::sleep(Duration::from_millis(SERVER_READY_POLL_INTERVAL_MS)).await;
                }
            }
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self._shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
