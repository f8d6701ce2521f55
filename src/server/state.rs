use axum::extract::FromRef;

use crate::catalog_client::CatalogClientFactory;
use crate::tune::TuneService;
use std::sync::Arc;
use std::time::Instant;

use super::ServerConfig;

pub type GuardedTuneService = Arc<TuneService>;
pub type GuardedCatalogClientFactory = Arc<dyn CatalogClientFactory>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    pub tune_service: GuardedTuneService,
    pub catalog_client_factory: GuardedCatalogClientFactory,
    pub hash: String,
}

impl FromRef<ServerState> for GuardedTuneService {
    fn from_ref(input: &ServerState) -> Self {
        input.tune_service.clone()
    }
}

impl FromRef<ServerState> for GuardedCatalogClientFactory {
    fn from_ref(input: &ServerState) -> Self {
        input.catalog_client_factory.clone()
    }
}

impl FromRef<ServerState> for ServerConfig {
    fn from_ref(input: &ServerState) -> Self {
        input.config.clone()
    }
}
