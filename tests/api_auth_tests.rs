// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API authentication and CORS tests.
//!
//! These tests verify that:
//! 1. The realtime endpoint rejects requests without a valid token
//! 2. Tokens are accepted from either the cookie or the Authorization header
//! 3. The health check is public and carries security headers

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use pulse_engine::middleware::auth::{create_jwt, TOKEN_COOKIE};
use tower::ServiceExt;

mod common;

#[tokio::test]
async fn test_ws_requires_token() {
    let (app, _) = common::create_test_app();

    let response = app
        .oneshot(Request::builder().uri("/ws").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["error"], "unauthorized");
}

#[tokio::test]
async fn test_ws_rejects_garbage_token() {
    let (app, _) = common::create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/ws")
                .header(header::AUTHORIZATION, "Bearer not-a-jwt")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_ws_rejects_token_signed_with_other_key() {
    let (app, _) = common::create_test_app();
    let token = create_jwt("alice", b"some_other_key_that_is_long_enough").unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/ws")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_ws_accepts_bearer_token() {
    let (app, state) = common::create_test_app();
    let token = create_jwt("alice", &state.config.jwt_signing_key).unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/ws")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    // Auth passes; the upgrade itself fails because this is not a real
    // WebSocket handshake.
    assert_ne!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_ws_accepts_cookie_token() {
    let (app, state) = common::create_test_app();
    let token = create_jwt("alice", &state.config.jwt_signing_key).unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/ws")
                .header(header::COOKIE, format!("{TOKEN_COOKIE}={token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_ne!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_health_is_public() {
    let (app, _) = common::create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("x-content-type-options").unwrap(),
        "nosniff"
    );

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "ok");
    assert_eq!(json["connections"], 0);
    assert_eq!(json["online_users"], 0);
    assert_eq!(json["queued_notifications"], 0);
}

#[tokio::test]
async fn test_cors_preflight_allows_localhost() {
    let (app, _) = common::create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/health")
                .header(header::ORIGIN, "http://localhost:5173")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .unwrap(),
        "http://localhost:5173"
    );
}

#[tokio::test]
async fn test_cors_rejects_unknown_origin() {
    let (app, _) = common::create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/health")
                .header(header::ORIGIN, "https://evil.example")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert!(response
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .is_none());
}

#[tokio::test]
async fn test_health_counts_users_within_configured_presence_window() {
    let config = pulse_engine::config::Config {
        presence_window: std::time::Duration::from_secs(60),
        ..pulse_engine::config::Config::test_default()
    };
    let h = common::harness_with(config, common::Behavior::Succeed, common::Behavior::Succeed);
    let now = chrono::Utc::now();
    h.state.presence.touch_at("fresh", now);
    // Online under the default five-minute window, stale under one minute.
    h.state
        .presence
        .touch_at("idle", now - chrono::Duration::minutes(2));

    let app = pulse_engine::routes::create_router(h.state.clone());
    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["online_users"], 1);
    assert_eq!(h.state.presence.online(), vec!["fresh".to_string()]);
}
