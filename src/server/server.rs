use anyhow::{Context, Result};
use std::future::IntoFuture;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::State, middleware, response::IntoResponse, routing::get, Json, Router,
};
use serde::Serialize;
use tracing::info;

#[cfg(feature = "slowdown")]
use super::slowdown_request;
use super::{log_requests, metrics, state::*, tune_routes::make_tune_routes, ServerConfig};
use crate::catalog_client::CatalogClientFactory;
use crate::tune::TuneService;

#[derive(Serialize)]
struct ServerStats {
    pub uptime: String,
    pub hash: String,
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

async fn home(State(state): State<ServerState>) -> impl IntoResponse {
    let stats = ServerStats {
        uptime: format_uptime(state.start_time.elapsed()),
        hash: state.hash.clone(),
    };
    Json(stats)
}

pub fn make_app(
    config: ServerConfig,
    tune_service: Arc<TuneService>,
    catalog_client_factory: Arc<dyn CatalogClientFactory>,
) -> Router {
    let state = ServerState {
        config,
        start_time: Instant::now(),
        tune_service,
        catalog_client_factory,
        hash: env!("GIT_HASH").to_string(),
    };

    let home_router: Router = Router::new()
        .route("/", get(home))
        .with_state(state.clone());

    let mut app: Router = home_router.nest("/v1/tune", make_tune_routes(state.clone()));

    #[cfg(feature = "slowdown")]
    {
        app = app.layer(middleware::from_fn(slowdown_request));
    }
    app = app.layer(middleware::from_fn_with_state(state, log_requests));

    app
}

fn make_metrics_app() -> Router {
    Router::new().route("/metrics", get(metrics::metrics_handler))
}

pub async fn run_server(
    config: ServerConfig,
    tune_service: Arc<TuneService>,
    catalog_client_factory: Arc<dyn CatalogClientFactory>,
) -> Result<()> {
    let port = config.port;
    let metrics_port = config.metrics_port;
    let app = make_app(config, tune_service, catalog_client_factory);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port))
        .await
        .with_context(|| format!("Failed to bind port {}", port))?;
    let metrics_listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", metrics_port))
        .await
        .with_context(|| format!("Failed to bind metrics port {}", metrics_port))?;

    info!("Serving metrics at :{}/metrics", metrics_port);
    tokio::select! {
        result = axum::serve(listener, app).into_future() => result?,
        result = axum::serve(metrics_listener, make_metrics_app()).into_future() => result?,
    }
    Ok(())
}
