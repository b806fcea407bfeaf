// This project was developed with assistance from GitHub Copilot
// JWKS and auth endpoint handlers

use axum::{
    extract::{Query, State},
    response::Json,
};
use std::sync::Arc;

use crate::credentials::Subject;
use crate::db::KeyStore;
use crate::discovery;
use crate::error::{JwksError, Result};
use crate::issuer::TokenIssuer;
use crate::types::{AuthQuery, AuthResponse, JwksResponse};

/// Shared handler state: the store handle and the token issuer.
/// No key material is held here; every request re-reads the store.
#[derive(Debug, Clone)]
pub struct AppContext {
    pub store: KeyStore,
    pub issuer: TokenIssuer,
}

/// Application state shared across handlers
pub type AppState = Arc<AppContext>;

impl AppContext {
    pub fn new(store: KeyStore, issuer: TokenIssuer) -> AppState {
        Arc::new(AppContext { store, issuer })
    }
}

/// Run a blocking store operation off the async executor.
async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| JwksError::Io(std::io::Error::other(e)))?
}

/// JWKS endpoint handler - serves public keys in JWKS format
/// Only returns keys that have not expired
pub async fn jwks_handler(State(state): State<AppState>) -> Result<Json<JwksResponse>> {
    let jwks = blocking(move || discovery::publish(&state.store)).await?;
    Ok(Json(jwks))
}

/// Auth endpoint handler - issues JWTs for the caller's subject
/// `?expired=true` signs with an expired key
pub async fn auth_handler(
    State(state): State<AppState>,
    Query(pairs): Query<Vec<(String, String)>>,
    subject: Subject,
) -> Result<Json<AuthResponse>> {
    let use_expired = AuthQuery::from_pairs(&pairs).wants_expired();
    tracing::debug!(source = ?subject.source, use_expired, "token requested");

    let token = blocking(move || state.issuer.issue(&state.store, &subject.value, use_expired))
        .await?;
    Ok(Json(AuthResponse { token }))
}
