#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use phraseology_trainer::db::config::DbConfig;
use phraseology_trainer::db::DatabaseProxy;
use phraseology_trainer::services::ModelSyncService;
use phraseology_trainer::state::AppState;

pub const TEST_MODEL_ID: &str = "test-model";

pub struct TestApp {
    pub router: Router,
    pub proxy: Arc<DatabaseProxy>,
    _dir: TempDir,
}

impl TestApp {
    pub fn service(&self) -> ModelSyncService {
        ModelSyncService::new(Arc::clone(&self.proxy), TEST_MODEL_ID)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        send(&self.router, Method::GET, uri, None).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        send(&self.router, Method::POST, uri, Some(body.to_string())).await
    }

    pub async fn post_raw(&self, uri: &str, body: &str) -> (StatusCode, Value) {
        send(&self.router, Method::POST, uri, Some(body.to_string())).await
    }
}

pub async fn create_test_proxy() -> (Arc<DatabaseProxy>, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let config = DbConfig::for_path(dir.path().join("trainer.db"));
    let proxy = DatabaseProxy::connect(config).await.unwrap();
    (proxy, dir)
}

pub async fn create_test_app() -> TestApp {
    let (proxy, dir) = create_test_proxy().await;
    let state = AppState::new(Some(Arc::clone(&proxy)), TEST_MODEL_ID);

    TestApp {
        router: phraseology_trainer::create_app_with_state(state),
        proxy,
        _dir: dir,
    }
}

pub fn create_test_app_without_db() -> Router {
    phraseology_trainer::create_app_with_state(AppState::new(None, TEST_MODEL_ID))
}

pub async fn send(
    router: &Router,
    method: Method,
    uri: &str,
    body: Option<String>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if body.is_some() {
        builder = builder.header("content-type", "application/json");
    }
    let request = builder
        .body(body.map(Body::from).unwrap_or_else(Body::empty))
        .unwrap();

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}
