//! Common test infrastructure
//!
//! This module provides all the infrastructure needed for end-to-end tests.
//! Tests should only import from this module, not from internal submodules.
//!
//! # Example
//!
//! ```no_run
//! mod common;
//! use common::{TestServer, TestClient, TEST_TOKEN};
//! use reqwest::StatusCode;
//!
//! #[tokio::test]
//! async fn test_list_playlists() {
//!     let server = TestServer::spawn().await;
//!     let client = TestClient::with_token(server.base_url.clone(), TEST_TOKEN);
//!
//!     let response = client.get_playlists().await;
//!     assert_eq!(response.status(), StatusCode::OK);
//! }
//! ```

mod client;
mod constants;
mod fake_catalog;
mod server;

// Public API - this is what tests import
pub use client::TestClient;
pub use constants::*;
#[allow(unused_imports)]
pub use fake_catalog::FakeCatalog;
pub use server::TestServer;
