use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use std::{fmt::Debug, path::PathBuf};
use tracing::{error, info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use tune_neutral_server::catalog_client::{CatalogClientFactory, SpotifyClientFactory};
use tune_neutral_server::config;
use tune_neutral_server::kv_store::{InMemoryKvStore, KvStore, SqliteKvStore};
use tune_neutral_server::server::{metrics, run_server, RequestsLoggingLevel, ServerConfig};
use tune_neutral_server::tune::TuneService;
use tune_neutral_server::tune_store::TuneStore;

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(msg).with_context(|| format!("Error resolving path: {}", s));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to a TOML configuration file. Values in it override CLI flags.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Directory holding the SQLite database.
    #[clap(long, value_parser = parse_path)]
    pub db_dir: Option<PathBuf>,

    /// Keep all data in memory, nothing survives a restart.
    #[clap(long)]
    pub ephemeral: bool,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 3040)]
    pub port: u16,

    /// The port for the metrics server (Prometheus scraping).
    #[clap(long, default_value_t = 9094)]
    pub metrics_port: u16,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// Base URL of the music catalog Web API.
    #[clap(long, default_value = config::DEFAULT_CATALOG_API_URL)]
    pub catalog_api_url: String,

    /// Timeout in seconds for a single catalog request.
    #[clap(long, default_value_t = 30)]
    pub catalog_timeout_sec: u64,

    /// Interval in minutes between purges of expired entries. Set to 0 to disable.
    #[clap(long, default_value_t = 60)]
    pub prune_interval_minutes: u64,
}

/// Convert CLI args to CliConfig for config resolution
impl From<&CliArgs> for config::CliConfig {
    fn from(args: &CliArgs) -> Self {
        config::CliConfig {
            db_dir: args.db_dir.clone(),
            ephemeral: args.ephemeral,
            port: args.port,
            metrics_port: args.metrics_port,
            logging_level: args.logging_level.clone(),
            catalog_api_url: args.catalog_api_url.clone(),
            catalog_timeout_sec: args.catalog_timeout_sec,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .unwrap();

    // Load TOML config if provided
    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            Some(config::FileConfig::load(path)?)
        }
        None => None,
    };

    // Resolve final configuration (TOML overrides CLI)
    let cli_config: config::CliConfig = (&cli_args).into();
    let app_config = config::AppConfig::resolve(&cli_config, file_config)?;

    info!("Configuration loaded:");
    info!("  db_dir: {:?}", app_config.db_dir);
    info!("  port: {}", app_config.port);
    info!("  catalog: {}", app_config.catalog.api_url);

    let kv_store: Arc<dyn KvStore> = match app_config.tune_db_path() {
        Some(db_path) => {
            if !db_path.exists() {
                info!("Creating new tune database at {:?}", db_path);
            }
            let store = Arc::new(SqliteKvStore::new(&db_path)?);
            if cli_args.prune_interval_minutes > 0 {
                let store = store.clone();
                let interval = Duration::from_secs(cli_args.prune_interval_minutes * 60);
                tokio::spawn(async move {
                    let mut ticker = tokio::time::interval(interval);
                    loop {
                        ticker.tick().await;
                        match store.prune_expired() {
                            Ok(0) => {}
                            Ok(pruned) => info!("Pruned {} expired entries", pruned),
                            Err(e) => error!("Failed to prune expired entries: {}", e),
                        }
                    }
                });
            }
            store
        }
        None => {
            info!("Running ephemeral, data is kept in memory only");
            Arc::new(InMemoryKvStore::new())
        }
    };

    // Initialize metrics system
    info!("Initializing metrics...");
    metrics::init_metrics();

    let tune_service = Arc::new(TuneService::new(
        TuneStore::new(kv_store),
        app_config.tune_service_config(),
    ));
    let catalog_client_factory: Arc<dyn CatalogClientFactory> = Arc::new(
        SpotifyClientFactory::new(
            &app_config.catalog.api_url,
            app_config.catalog.timeout_sec,
            app_config.catalog_min_request_interval(),
        )?,
    );

    let server_config = ServerConfig {
        requests_logging_level: app_config.logging_level.clone(),
        port: app_config.port,
        metrics_port: app_config.metrics_port,
    };

    info!("Ready to serve at port {}!", app_config.port);
    info!("Metrics available at port {}!", app_config.metrics_port);
    run_server(server_config, tune_service, catalog_client_factory).await
}
