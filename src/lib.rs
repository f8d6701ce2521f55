//! Tune Neutral Server Library
//!
//! This library exposes the internal modules for testing and potential reuse.

pub mod catalog_client;
pub mod config;
pub mod kv_store;
pub mod server;
pub mod sqlite_persistence;
pub mod tune;
pub mod tune_store;

// Re-export commonly used types for convenience
pub use catalog_client::{CatalogClient, CatalogClientFactory, SpotifyClientFactory};
pub use kv_store::{InMemoryKvStore, KvStore, SqliteKvStore};
pub use server::{make_app, run_server, RequestsLoggingLevel, ServerConfig};
pub use tune::{TuneService, TuneServiceConfig};
pub use tune_store::TuneStore;
