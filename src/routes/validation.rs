use axum::body::Body;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;

use crate::phraseology::{
    validate_jumbled_sequence, validate_pronunciation, validate_readback_correction,
    validate_scenario_response, ErrorSelectionResult, GroundTruthError, PronunciationResult,
    Scenario, SequenceResult, ValidationResult,
};
use crate::response::AppError;
use crate::routes::{strict_json, SuccessResponse};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/scenario", post(scenario))
        .route("/readback-correction", post(readback_correction))
        .route("/jumbled", post(jumbled))
        .route("/pronunciation", post(pronunciation))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScenarioBody {
    user_response: String,
    correct_response: String,
    scenario: Scenario,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReadbackCorrectionBody {
    selected_errors: Vec<String>,
    actual_errors: Vec<GroundTruthError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JumbledBody {
    arranged: Vec<String>,
    correct_order: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PronunciationBody {
    selected: String,
    correct: String,
}

async fn scenario(body: Body) -> Result<Json<SuccessResponse<ValidationResult>>, AppError> {
    let body: ScenarioBody = strict_json(body).await?;
    let result = validate_scenario_response(&body.user_response, &body.correct_response, &body.scenario);
    Ok(Json(SuccessResponse {
        success: true,
        data: result,
    }))
}

async fn readback_correction(
    body: Body,
) -> Result<Json<SuccessResponse<ErrorSelectionResult>>, AppError> {
    let body: ReadbackCorrectionBody = strict_json(body).await?;
    if body.actual_errors.is_empty() {
        return Err(AppError::validation("actualErrors must not be empty"));
    }
    let result = validate_readback_correction(&body.selected_errors, &body.actual_errors);
    Ok(Json(SuccessResponse {
        success: true,
        data: result,
    }))
}

async fn jumbled(body: Body) -> Result<Json<SuccessResponse<SequenceResult>>, AppError> {
    let body: JumbledBody = strict_json(body).await?;
    if body.correct_order.is_empty() {
        return Err(AppError::validation("correctOrder must not be empty"));
    }
    Ok(Json(SuccessResponse {
        success: true,
        data: validate_jumbled_sequence(&body.arranged, &body.correct_order),
    }))
}

async fn pronunciation(body: Body) -> Result<Json<SuccessResponse<PronunciationResult>>, AppError> {
    let body: PronunciationBody = strict_json(body).await?;
    Ok(Json(SuccessResponse {
        success: true,
        data: validate_pronunciation(&body.selected, &body.correct),
    }))
}
