use super::metrics;
use super::state::ServerState;
use crate::catalog_client::{CatalogClient, CatalogError};

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::IntoResponse,
};
use std::sync::Arc;
use tracing::{debug, error};

/// The caller, identified by the catalog through their access token.
pub struct Session {
    pub user_id: String,
    /// Catalog client acting with the caller's token.
    pub client: Arc<dyn CatalogClient>,
}

pub const HEADER_SESSION_TOKEN_KEY: &str = "Authorization";
const BEARER_PREFIX: &str = "Bearer ";

#[derive(Debug)]
pub enum SessionExtractionError {
    AccessDenied,
    InternalError,
}

impl IntoResponse for SessionExtractionError {
    fn into_response(self) -> axum::response::Response {
        match self {
            SessionExtractionError::AccessDenied => StatusCode::FORBIDDEN.into_response(),
            SessionExtractionError::InternalError => {
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}

fn extract_session_token_from_headers(parts: &Parts) -> Option<String> {
    let value = parts.headers.get(HEADER_SESSION_TOKEN_KEY)?.to_str().ok()?;
    let token = value.strip_prefix(BEARER_PREFIX).unwrap_or(value).trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

async fn extract_session_from_request_parts(
    parts: &Parts,
    ctx: &ServerState,
) -> Result<Session, SessionExtractionError> {
    let token = match extract_session_token_from_headers(parts) {
        None => {
            debug!("No token in headers.");
            return Err(SessionExtractionError::AccessDenied);
        }
        Some(x) => x,
    };

    let client = ctx.catalog_client_factory.client_for_token(&token);
    match client.current_user_id().await {
        Ok(user_id) => {
            debug!("Resolved session for user {}", user_id);
            Ok(Session { user_id, client })
        }
        Err(CatalogError::Status { status, .. }) if status == 401 || status == 403 => {
            debug!("Catalog rejected token with status {}", status);
            Err(SessionExtractionError::AccessDenied)
        }
        Err(err) => {
            metrics::record_catalog_error(err.kind());
            error!("Failed to resolve session user: {}", err);
            Err(SessionExtractionError::InternalError)
        }
    }
}

impl FromRequestParts<ServerState> for Session {
    type Rejection = SessionExtractionError;

    async fn from_request_parts(
        parts: &mut Parts,
        ctx: &ServerState,
    ) -> Result<Self, Self::Rejection> {
        extract_session_from_request_parts(parts, ctx).await
    }
}
