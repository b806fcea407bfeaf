// This project was developed with assistance from GitHub Copilot
// Server setup and configuration

use axum::{
    Router,
    routing::{get, post},
};
use tokio::net::TcpListener;

use crate::config::Config;
use crate::db::KeyStore;
use crate::endpoints::{AppContext, AppState, auth_handler, jwks_handler};
use crate::error::Result;
use crate::issuer::TokenIssuer;
use crate::key_management;

/// Create the application router with all endpoints
pub fn create_app(app_state: AppState) -> Router {
    Router::new()
        .route("/.well-known/jwks.json", get(jwks_handler))
        .route("/jwks", get(jwks_handler)) // Alternative endpoint
        .route("/auth", post(auth_handler))
        .with_state(app_state)
}

/// Open the store, seed it per `config.seed` and build the shared state.
pub fn prepare_state(config: &Config) -> Result<AppState> {
    let store = KeyStore::open(&config.db_path)?;
    key_management::provision(&store, config.seed, config.key_bits)?;
    Ok(AppContext::new(store, TokenIssuer::default()))
}

pub async fn start_server(config: Config) -> Result<()> {
    let app_state = prepare_state(&config)?;
    let app = create_app(app_state);

    let listener = TcpListener::bind(config.bind).await?;
    tracing::info!(
        addr = %config.bind,
        db = %config.db_path.display(),
        "JWKS server listening; GET /.well-known/jwks.json, GET /jwks, POST /auth[?expired=true]"
    );

    axum::serve(listener, app).await?;

    Ok(())
}
