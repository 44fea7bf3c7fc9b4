use axum::body::Body;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};

use crate::adaptive::ScoredInteraction;
use crate::response::AppError;
use crate::routes::{strict_json, SuccessResponse};
use crate::services::model_sync::RecordedInteraction;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/interactions", post(record_interaction))
}

async fn record_interaction(
    State(state): State<AppState>,
    body: Body,
) -> Result<Json<SuccessResponse<RecordedInteraction>>, AppError> {
    let interaction: ScoredInteraction = strict_json(body).await?;
    let service = state.model_sync()?;
    let recorded = service.record_interaction(&interaction).await?;
    Ok(Json(SuccessResponse {
        success: true,
        data: recorded,
    }))
}
