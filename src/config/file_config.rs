use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Core settings (can override CLI)
    pub db_dir: Option<String>,
    pub port: Option<u16>,
    pub metrics_port: Option<u16>,
    pub logging_level: Option<String>,
    pub catalog_api_url: Option<String>,
    pub catalog_timeout_sec: Option<u64>,

    // Feature configs
    pub catalog: Option<CatalogConfig>,
    pub ingestion: Option<IngestionFileConfig>,
    pub playlist: Option<PlaylistFileConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct CatalogConfig {
    pub min_request_interval_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct IngestionFileConfig {
    pub page_size: Option<u32>,
    pub max_indexed_tracks: Option<usize>,
    pub fetch_lock_minutes: Option<u64>,
    pub remote_call_timeout_sec: Option<u64>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct PlaylistFileConfig {
    pub length: Option<usize>,
    pub lookback_days: Option<u32>,
    pub remote_playlist_name: Option<String>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}
