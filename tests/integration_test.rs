use axum::http::{Method, StatusCode};
use serde_json::json;

mod common;

#[tokio::test]
async fn test_health_root() {
    let app = common::create_test_app().await;

    let (status, body) = app.get("/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], "connected");
}

#[tokio::test]
async fn test_health_root_without_store() {
    let app = common::create_test_app_without_db();

    let (status, body) = common::send(&app, Method::GET, "/health", None).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["database"], "disconnected");
}

#[tokio::test]
async fn test_health_live() {
    let app = common::create_test_app_without_db();

    let (status, body) = common::send(&app, Method::GET, "/health/live", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_unknown_route_is_json_404() {
    let app = common::create_test_app_without_db();

    let (status, body) = common::send(&app, Method::GET, "/nowhere", None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_validate_scenario_perfect_readback() {
    let app = common::create_test_app().await;

    let (status, body) = app
        .post(
            "/api/validate/scenario",
            json!({
                "userResponse": "Climb and maintain flight level 350, heading 270, Speedbird 123",
                "correctResponse": "Climb and maintain flight level 350, heading 270, Speedbird 123",
                "scenario": {
                    "callSign": "Speedbird 123",
                    "atcClearance": "Speedbird 123, climb and maintain flight level 350, turn left heading 270"
                }
            }),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["correct"], true);
    assert_eq!(body["data"]["score"], 100);
    assert!(body["data"]["corrections"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_validate_scenario_missing_runway() {
    let app = common::create_test_app().await;

    let (status, body) = app
        .post(
            "/api/validate/scenario",
            json!({
                "userResponse": "Climb and maintain flight level 350, heading 270, Speedbird 123",
                "correctResponse": "Climb and maintain flight level 350, heading 270, runway 27L, Speedbird 123",
                "scenario": {
                    "callSign": "Speedbird 123",
                    "atcClearance": "climb and maintain flight level 350, heading 270, runway 27L"
                }
            }),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["correct"], false);
    assert_eq!(body["data"]["score"], 85);
    assert_eq!(body["data"]["corrections"], json!(["Missing element: \"runway 27L\""]));
}

#[tokio::test]
async fn test_validate_readback_correction() {
    let app = common::create_test_app().await;

    let (status, body) = app
        .post(
            "/api/validate/readback-correction",
            json!({
                "selectedErrors": ["speed", "altitude"],
                "actualErrors": [{ "incorrect": "speed" }, { "incorrect": "heading" }]
            }),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["foundCount"], 1);
    assert_eq!(body["data"]["totalErrors"], 2);
    assert_eq!(body["data"]["score"], 50);
}

#[tokio::test]
async fn test_validate_jumbled_and_pronunciation() {
    let app = common::create_test_app().await;

    let (_, body) = app
        .post(
            "/api/validate/jumbled",
            json!({ "arranged": ["A", "C", "B"], "correctOrder": ["A", "B", "C"] }),
        )
        .await;
    assert_eq!(body["data"]["correctPositions"], 1);
    assert_eq!(body["data"]["score"], 33);

    let (_, body) = app
        .post("/api/validate/pronunciation", json!({ "selected": "TREE", "correct": "THREE" }))
        .await;
    assert_eq!(body["data"]["correct"], false);
    assert_eq!(body["data"]["score"], 0);
}

#[tokio::test]
async fn test_validate_rejects_malformed_body() {
    let app = common::create_test_app().await;

    let (status, body) = app.post_raw("/api/validate/pronunciation", "{\"selected\":").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_record_interaction_endpoint() {
    let app = common::create_test_app().await;
    app.post("/database?action=init", json!({})).await;

    let (status, body) = app
        .post(
            "/api/training/interactions",
            json!({
                "categories": { "pattern": "heading", "errors": ["substitution"], "phase": "enroute" },
                "score": 40,
                "correct": false,
                "userCorrection": { "original": "heading 290", "corrected": "heading 270" }
            }),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert!(body["data"]["update"]["deltas"]["pattern:heading"].is_number());
    assert_eq!(body["data"]["stats"]["totalInteractions"], 1);

    let (_, body) = app.get("/database").await;
    assert_eq!(body["recent"]["corrections"][0]["corrected"], "heading 270");
    assert_eq!(body["recent"]["weightUpdates"].as_array().unwrap().len(), 1);
}
