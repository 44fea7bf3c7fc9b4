pub mod adaptive;
pub mod config;
pub mod db;
pub mod logging;
pub mod phraseology;
pub mod response;
pub mod routes;
pub mod services;
pub mod state;

use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::Config;
use crate::state::AppState;

/// Builds the router with tracing and CORS layers around `state`.
pub fn create_app_with_state(state: AppState) -> axum::Router {
    routes::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Connects the store described by the environment. A store that cannot be
/// opened leaves the app running without persistence.
pub async fn create_app(config: &Config) -> axum::Router {
    let db_proxy = match db::DatabaseProxy::from_env().await {
        Ok(proxy) => Some(proxy),
        Err(err) => {
            tracing::warn!(error = %err, "database proxy not initialized");
            None
        }
    };

    create_app_with_state(AppState::new(db_proxy, config.model_id.clone()))
}
