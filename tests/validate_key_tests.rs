// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Public validate-key endpoint: status codes, bodies and metering.

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::json;
use tower::ServiceExt;

mod common;
use common::{body_json, create_test_app, json_request};

async fn validate(app: &axum::Router, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
    let response = app
        .clone()
        .oneshot(json_request("POST", "/api/validate-key", None, body))
        .await
        .unwrap();
    let status = response.status();
    (status, body_json(response).await)
}

#[tokio::test]
async fn test_missing_key_is_bad_request() {
    let (app, _, _) = create_test_app();

    for body in [json!({}), json!({ "apiKey": "" }), json!({ "apiKey": "   " })] {
        let (status, body) = validate(&app, body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body,
            json!({ "valid": false, "message": "No API key provided" })
        );
    }
}

#[tokio::test]
async fn test_unreadable_body_is_bad_request() {
    let (app, _, _) = create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/validate-key")
                .body(Body::from("not json"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["valid"], false);
}

#[tokio::test]
async fn test_unknown_key_is_invalid() {
    let (app, _, _) = create_test_app();

    let (status, body) = validate(&app, json!({ "apiKey": "tvly-unknown" })).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "valid": false, "message": "Invalid API key" }));
}

#[tokio::test]
async fn test_known_key_is_valid_and_metered() {
    let (app, state, _) = create_test_app();
    let key = state
        .api_key_service
        .create("default", "tvly-abc")
        .await
        .unwrap();

    let (status, body) = validate(&app, json!({ "apiKey": "tvly-abc" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "valid": true, "message": "API key is valid" }));

    validate(&app, json!({ "apiKey": "tvly-abc" })).await;

    let key = state.api_key_service.get(&key.id).await.unwrap();
    assert_eq!(key.usage_count, 2);
}

#[tokio::test]
async fn test_failed_validation_is_not_metered() {
    let (app, state, _) = create_test_app();
    let key = state
        .api_key_service
        .create("default", "tvly-abc")
        .await
        .unwrap();

    validate(&app, json!({ "apiKey": "tvly-ab" })).await;
    validate(&app, json!({ "apiKey": "TVLY-ABC" })).await;

    let key = state.api_key_service.get(&key.id).await.unwrap();
    assert_eq!(key.usage_count, 0);
}

#[tokio::test]
async fn test_deleted_key_is_invalid() {
    let (app, state, _) = create_test_app();
    let key = state
        .api_key_service
        .create("default", "tvly-abc")
        .await
        .unwrap();
    state.api_key_service.delete(&key.id).await.unwrap();

    let (status, body) = validate(&app, json!({ "apiKey": "tvly-abc" })).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["valid"], false);
}

#[tokio::test]
async fn test_storage_failure_is_server_error() {
    let (app, state, store) = create_test_app();
    state
        .api_key_service
        .create("default", "tvly-abc")
        .await
        .unwrap();
    store.set_unavailable(true);

    let (status, body) = validate(&app, json!({ "apiKey": "tvly-abc" })).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body,
        json!({ "valid": false, "message": "Error validating key" })
    );
}
