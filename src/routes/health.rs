use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .route("/live", get(live))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: &'static str,
    database: &'static str,
    model_id: String,
    timestamp: String,
}

#[derive(Serialize)]
struct LivenessResponse {
    status: &'static str,
    timestamp: String,
    uptime: u64,
    version: &'static str,
}

async fn root(State(state): State<AppState>) -> Response {
    let connected = match state.db_proxy() {
        Some(proxy) => match proxy.ping().await {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(error = %err, "health check ping failed");
                false
            }
        },
        None => false,
    };

    let response = HealthResponse {
        status: if connected { "ok" } else { "degraded" },
        database: if connected { "connected" } else { "disconnected" },
        model_id: state.model_id().to_string(),
        timestamp: now_iso(),
    };

    let status_code = if connected {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status_code, Json(response)).into_response()
}

async fn live(State(state): State<AppState>) -> Response {
    Json(LivenessResponse {
        status: "healthy",
        timestamp: now_iso(),
        uptime: state.uptime_seconds(),
        version: env!("CARGO_PKG_VERSION"),
    })
    .into_response()
}

fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
