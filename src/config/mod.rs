mod file_config;

pub use file_config::{CatalogConfig, FileConfig, IngestionFileConfig, PlaylistFileConfig};

use crate::server::RequestsLoggingLevel;
use crate::tune::{IngestionConfig, PlaylistConfig, TuneServiceConfig};
use anyhow::{bail, Result};
use clap::ValueEnum;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_CATALOG_API_URL: &str = "https://api.spotify.com/v1";

/// Largest page the catalog serves for saved tracks.
const MAX_PAGE_SIZE: u32 = 50;

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub db_dir: Option<PathBuf>,
    pub ephemeral: bool,
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub catalog_api_url: String,
    pub catalog_timeout_sec: u64,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            db_dir: None,
            ephemeral: false,
            port: 3040,
            metrics_port: 9094,
            logging_level: RequestsLoggingLevel::Path,
            catalog_api_url: DEFAULT_CATALOG_API_URL.to_string(),
            catalog_timeout_sec: 30,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    // Core settings
    /// `None` for ephemeral runs, which keep everything in memory.
    pub db_dir: Option<PathBuf>,
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,

    // Feature configs (with defaults)
    pub catalog: CatalogSettings,
    pub ingestion: IngestionSettings,
    pub playlist: PlaylistSettings,
}

#[derive(Debug, Clone)]
pub struct CatalogSettings {
    pub api_url: String,
    pub timeout_sec: u64,
    pub min_request_interval_ms: u64,
}

#[derive(Debug, Clone)]
pub struct IngestionSettings {
    pub page_size: u32,
    pub max_indexed_tracks: usize,
    pub fetch_lock_minutes: u64,
    pub remote_call_timeout_sec: u64,
}

impl Default for IngestionSettings {
    fn default() -> Self {
        Self {
            page_size: 20,
            max_indexed_tracks: 1000,
            fetch_lock_minutes: 45,
            remote_call_timeout_sec: 60,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PlaylistSettings {
    pub length: usize,
    pub lookback_days: u32,
    pub remote_playlist_name: String,
}

impl Default for PlaylistSettings {
    fn default() -> Self {
        Self {
            length: 10,
            lookback_days: 7,
            remote_playlist_name: "Tune Neutral".to_string(),
        }
    }
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let db_dir = file.db_dir.map(PathBuf::from).or_else(|| cli.db_dir.clone());
        let db_dir = match (db_dir, cli.ephemeral) {
            (_, true) => None,
            (Some(db_dir), false) => {
                if !db_dir.exists() {
                    bail!("Database directory does not exist: {:?}", db_dir);
                }
                if !db_dir.is_dir() {
                    bail!("db_dir is not a directory: {:?}", db_dir);
                }
                Some(db_dir)
            }
            (None, false) => bail!(
                "db_dir must be specified via --db-dir or in config file, or run with --ephemeral"
            ),
        };

        let port = file.port.unwrap_or(cli.port);
        let metrics_port = file.metrics_port.unwrap_or(cli.metrics_port);

        let logging_level = file
            .logging_level
            .and_then(|s| parse_logging_level(&s))
            .unwrap_or_else(|| cli.logging_level.clone());

        let catalog_file = file.catalog.unwrap_or_default();
        let catalog = CatalogSettings {
            api_url: file
                .catalog_api_url
                .unwrap_or_else(|| cli.catalog_api_url.clone()),
            timeout_sec: file.catalog_timeout_sec.unwrap_or(cli.catalog_timeout_sec),
            min_request_interval_ms: catalog_file.min_request_interval_ms.unwrap_or(0),
        };
        if catalog.timeout_sec == 0 {
            bail!("catalog_timeout_sec must be positive");
        }

        let defaults = IngestionSettings::default();
        let ingestion_file = file.ingestion.unwrap_or_default();
        let ingestion = IngestionSettings {
            page_size: ingestion_file.page_size.unwrap_or(defaults.page_size),
            max_indexed_tracks: ingestion_file
                .max_indexed_tracks
                .unwrap_or(defaults.max_indexed_tracks),
            fetch_lock_minutes: ingestion_file
                .fetch_lock_minutes
                .unwrap_or(defaults.fetch_lock_minutes),
            remote_call_timeout_sec: ingestion_file
                .remote_call_timeout_sec
                .unwrap_or(defaults.remote_call_timeout_sec),
        };
        if ingestion.page_size == 0 || ingestion.page_size > MAX_PAGE_SIZE {
            bail!(
                "ingestion.page_size must be between 1 and {}, got {}",
                MAX_PAGE_SIZE,
                ingestion.page_size
            );
        }
        if ingestion.remote_call_timeout_sec == 0 {
            bail!("ingestion.remote_call_timeout_sec must be positive");
        }

        let defaults = PlaylistSettings::default();
        let playlist_file = file.playlist.unwrap_or_default();
        let playlist = PlaylistSettings {
            length: playlist_file.length.unwrap_or(defaults.length),
            lookback_days: playlist_file.lookback_days.unwrap_or(defaults.lookback_days),
            remote_playlist_name: playlist_file
                .remote_playlist_name
                .unwrap_or(defaults.remote_playlist_name),
        };
        if playlist.length == 0 {
            bail!("playlist.length must be positive");
        }

        Ok(Self {
            db_dir,
            port,
            metrics_port,
            logging_level,
            catalog,
            ingestion,
            playlist,
        })
    }

    pub fn tune_db_path(&self) -> Option<PathBuf> {
        self.db_dir.as_ref().map(|dir| dir.join("tune.db"))
    }

    pub fn catalog_min_request_interval(&self) -> Duration {
        Duration::from_millis(self.catalog.min_request_interval_ms)
    }

    pub fn tune_service_config(&self) -> TuneServiceConfig {
        TuneServiceConfig {
            ingestion: IngestionConfig {
                page_size: self.ingestion.page_size,
                max_indexed_tracks: self.ingestion.max_indexed_tracks,
                fetch_lock_ttl: Duration::from_secs(self.ingestion.fetch_lock_minutes * 60),
                remote_call_timeout: Duration::from_secs(self.ingestion.remote_call_timeout_sec),
            },
            playlist: PlaylistConfig {
                length: self.playlist.length,
                lookback_days: self.playlist.lookback_days,
            },
            remote_playlist_name: self.playlist.remote_playlist_name.clone(),
        }
    }
}

/// Parses a logging level string into RequestsLoggingLevel.
/// Uses clap's ValueEnum trait for parsing.
fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}
