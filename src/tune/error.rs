use crate::catalog_client::CatalogError;
use thiserror::Error;

/// Errors surfaced by the tune service operations.
#[derive(Debug, Error)]
pub enum TuneError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Remote service error: {0}")]
    RemoteService(#[from] CatalogError),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type TuneResult<T> = std::result::Result<T, TuneError>;
