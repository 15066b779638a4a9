// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::http::StatusCode;
use axum::response::IntoResponse;
use pulse_engine::error::AppError;
use pulse_engine::services::SessionError;

async fn body_json(err: AppError) -> (StatusCode, serde_json::Value) {
    let response = err.into_response();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn test_session_not_found_maps_to_404() {
    let err: AppError = SessionError::NotFound("abc".to_string()).into();
    let (status, json) = body_json(err).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "not_found");
    assert_eq!(json["details"], "session abc");
}

#[tokio::test]
async fn test_session_conflicts_map_to_400() {
    let err: AppError = SessionError::AlreadyCompleted("abc".to_string()).into();
    let (status, json) = body_json(err).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "validation_failed");
}

#[tokio::test]
async fn test_internal_error_hides_details() {
    let (status, json) = body_json(AppError::Internal(anyhow::anyhow!("db exploded"))).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(json.get("details").is_none());
}

#[tokio::test]
async fn test_unauthorized_maps_to_401() {
    let (status, json) = body_json(AppError::Unauthorized).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["error"], "unauthorized");
}
