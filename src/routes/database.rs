use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::adaptive::AdaptiveModelState;
use crate::db::operations::{CorpusFilter, CorpusStats, TrainingExample};
use crate::response::AppError;
use crate::routes::{parse_object, read_body};
use crate::services::model_sync::{
    CorpusExampleInput, ModelStateInput, ModelStats, ModelStatus, ModelSyncService,
};
use crate::state::AppState;

const VALID_ACTIONS: [&str; 6] = [
    "init",
    "sync",
    "load",
    "importCorpus",
    "getCorpus",
    "clearCorpus",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DatabaseAction {
    Init,
    Sync,
    Load,
    ImportCorpus,
    GetCorpus,
    ClearCorpus,
}

impl DatabaseAction {
    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "init" => Some(Self::Init),
            "sync" => Some(Self::Sync),
            "load" => Some(Self::Load),
            "importCorpus" => Some(Self::ImportCorpus),
            "getCorpus" => Some(Self::GetCorpus),
            "clearCorpus" => Some(Self::ClearCorpus),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct ActionQuery {
    action: Option<String>,
}

#[derive(Serialize)]
struct MessageResponse {
    success: bool,
    message: String,
}

#[derive(Serialize)]
struct InitResponse {
    success: bool,
    message: String,
    tables: Vec<&'static str>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LoadResponse {
    success: bool,
    model_state: AdaptiveModelState,
    stats: ModelStats,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ImportResponse {
    success: bool,
    message: String,
    corpus_stats: CorpusStats,
}

#[derive(Serialize)]
struct CorpusResponse {
    success: bool,
    corpus: Vec<TrainingExample>,
    stats: CorpusStats,
}

#[derive(Serialize)]
struct DatabaseInfo {
    connected: bool,
    provider: &'static str,
}

#[derive(Serialize)]
struct StatusResponse {
    success: bool,
    database: DatabaseInfo,
    #[serde(flatten)]
    status: ModelStatus,
}

pub(super) async fn status(State(state): State<AppState>) -> Response {
    let Some(proxy) = state.db_proxy() else {
        return disconnected("Database not configured");
    };
    let service = ModelSyncService::new(proxy.clone(), state.model_id());

    match service.status().await {
        Ok(status) => Json(StatusResponse {
            success: true,
            database: DatabaseInfo {
                connected: true,
                provider: proxy.provider(),
            },
            status,
        })
        .into_response(),
        Err(err) => {
            tracing::error!(error = %err, "database status check failed");
            disconnected(&err.to_string())
        }
    }
}

fn disconnected(error: &str) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "success": false,
            "database": { "connected": false, "error": error },
        })),
    )
        .into_response()
}

pub(super) async fn dispatch(
    State(state): State<AppState>,
    query: Option<Query<ActionQuery>>,
    body: Body,
) -> Result<Response, AppError> {
    let requested = query.and_then(|Query(query)| query.action);
    let Some(action) = requested.as_deref().and_then(DatabaseAction::parse) else {
        return Err(AppError::bad_request(format!(
            "Invalid action. Valid actions: {}",
            VALID_ACTIONS.join(", ")
        )));
    };

    let bytes = read_body(body).await?;
    let payload = match parse_object(&bytes) {
        Ok(map) => map,
        Err(err) => {
            tracing::warn!(error = %err, ?action, "unreadable request body, treating as empty object");
            Map::new()
        }
    };

    let service = state.model_sync()?;

    match action {
        DatabaseAction::Init => init(&service).await,
        DatabaseAction::Sync => sync(&service, payload).await,
        DatabaseAction::Load => load(&service).await,
        DatabaseAction::ImportCorpus => import_corpus(&service, payload).await,
        DatabaseAction::GetCorpus => get_corpus(&service, &payload).await,
        DatabaseAction::ClearCorpus => clear_corpus(&service).await,
    }
}

async fn init(service: &ModelSyncService) -> Result<Response, AppError> {
    let outcome = service.initialize().await?;
    Ok(Json(InitResponse {
        success: true,
        message: "Database initialized".to_string(),
        tables: outcome.tables,
    })
    .into_response())
}

async fn sync(
    service: &ModelSyncService,
    mut payload: Map<String, Value>,
) -> Result<Response, AppError> {
    let input = match payload.remove("modelState") {
        None | Some(Value::Null) => ModelStateInput::default(),
        Some(raw) => serde_json::from_value(raw)
            .map_err(|err| AppError::validation(format!("Invalid modelState: {err}")))?,
    };

    service.sync(&input).await?;
    Ok(Json(MessageResponse {
        success: true,
        message: "Model state synced".to_string(),
    })
    .into_response())
}

async fn load(service: &ModelSyncService) -> Result<Response, AppError> {
    let model_state = service.load().await?;
    let stats = ModelStats::from_history(&model_state.history);
    Ok(Json(LoadResponse {
        success: true,
        model_state,
        stats,
    })
    .into_response())
}

async fn import_corpus(
    service: &ModelSyncService,
    mut payload: Map<String, Value>,
) -> Result<Response, AppError> {
    let raw = match payload.remove("examples") {
        Some(Value::Array(items)) => items,
        _ => Vec::new(),
    };
    let examples: Vec<CorpusExampleInput> = serde_json::from_value(Value::Array(raw))
        .map_err(|err| AppError::validation(format!("Invalid examples: {err}")))?;

    let outcome = service.import_corpus(examples).await?;
    Ok(Json(ImportResponse {
        success: true,
        message: format!(
            "Imported {} of {} examples",
            outcome.stored, outcome.requested
        ),
        corpus_stats: outcome.corpus_stats,
    })
    .into_response())
}

async fn get_corpus(
    service: &ModelSyncService,
    payload: &Map<String, Value>,
) -> Result<Response, AppError> {
    let filter = corpus_filter(payload);
    let (corpus, stats) = service.get_corpus(&filter).await?;
    Ok(Json(CorpusResponse {
        success: true,
        corpus,
        stats,
    })
    .into_response())
}

async fn clear_corpus(service: &ModelSyncService) -> Result<Response, AppError> {
    let removed = service.clear_corpus().await?;
    Ok(Json(MessageResponse {
        success: true,
        message: format!("Cleared {removed} training examples"),
    })
    .into_response())
}

/// Optional filter fields fall back to their defaults when absent or mistyped.
fn corpus_filter(payload: &Map<String, Value>) -> CorpusFilter {
    let defaults = CorpusFilter::default();
    CorpusFilter {
        phase: payload
            .get("phase")
            .and_then(Value::as_str)
            .map(str::to_string),
        is_correct: payload.get("isCorrect").and_then(Value::as_bool),
        limit: payload
            .get("limit")
            .and_then(Value::as_i64)
            .filter(|limit| *limit >= 0)
            .unwrap_or(defaults.limit),
        offset: payload
            .get("offset")
            .and_then(Value::as_i64)
            .filter(|offset| *offset >= 0)
            .unwrap_or(defaults.offset),
    }
}
