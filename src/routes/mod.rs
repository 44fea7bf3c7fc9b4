mod database;
mod health;
mod training;
mod validation;

use axum::body::{Body, Bytes};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::response::AppError;
use crate::state::AppState;

const MAX_BODY_BYTES: usize = 1024 * 1024;

#[derive(Serialize)]
pub(crate) struct SuccessResponse<T> {
    pub success: bool,
    pub data: T,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/database",
            get(database::status)
                .post(database::dispatch)
                .fallback(fallback_handler),
        )
        .nest("/health", health::router())
        .nest("/api/validate", validation::router())
        .nest("/api/training", training::router())
        .fallback(fallback_handler)
        .with_state(state)
}

async fn fallback_handler() -> Response {
    AppError::not_found("Endpoint not found").into_response()
}

pub(crate) async fn read_body(body: Body) -> Result<Bytes, AppError> {
    axum::body::to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(|_| AppError::bad_request("Invalid request body"))
}

/// Parses a request body that must be a JSON object. An empty body counts
/// as `{}`.
pub(crate) fn parse_object(bytes: &[u8]) -> Result<Map<String, Value>, serde_json::Error> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Map::new());
    }
    match serde_json::from_slice::<Value>(bytes)? {
        Value::Object(map) => Ok(map),
        _ => Err(serde::de::Error::custom("expected a JSON object")),
    }
}

/// Strict typed body for endpoints where every field matters.
pub(crate) async fn strict_json<T: DeserializeOwned>(body: Body) -> Result<T, AppError> {
    let bytes = read_body(body).await?;
    serde_json::from_slice(&bytes)
        .map_err(|err| AppError::validation(format!("Invalid request body: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_object_treats_blank_body_as_empty() {
        assert!(parse_object(b"").unwrap().is_empty());
        assert!(parse_object(b"  \n").unwrap().is_empty());
    }

    #[test]
    fn test_parse_object_rejects_non_objects() {
        assert!(parse_object(b"[1,2]").is_err());
        assert!(parse_object(b"{not json").is_err());
        assert_eq!(parse_object(br#"{"a":1}"#).unwrap().len(), 1);
    }
}
