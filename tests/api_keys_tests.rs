// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Dashboard key management routes.

use axum::http::StatusCode;
use keyvault_api::config::Config;
use serde_json::json;
use tower::ServiceExt;

mod common;
use common::{
    body_json, create_test_app, create_test_app_with, create_test_jwt, empty_request,
    json_request, StaticIdentityProvider,
};

#[tokio::test]
async fn test_create_list_get() {
    let (app, state, _) = create_test_app();
    let token = create_test_jwt(&state.config.jwt_signing_key);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/keys",
            Some(&token),
            json!({ "name": "default", "value": "tvly-abc" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = body_json(response).await;
    assert_eq!(created["name"], "default");
    assert_eq!(created["value"], "tvly-abc");
    assert_eq!(created["usage_count"], 0);
    let id = created["id"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(empty_request("GET", "/api/keys", Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let listed = body_json(response).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["id"], id.as_str());

    let response = app
        .oneshot(empty_request("GET", &format!("/api/keys/{id}"), Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, created);
}

#[tokio::test]
async fn test_create_requires_fields() {
    let (app, state, _) = create_test_app();
    let token = create_test_jwt(&state.config.jwt_signing_key);

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/keys",
            Some(&token),
            json!({ "name": "default" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "missing_input");
}

#[tokio::test]
async fn test_patch_renames_without_touching_secret() {
    let (app, state, _) = create_test_app();
    let token = create_test_jwt(&state.config.jwt_signing_key);
    let key = state
        .api_key_service
        .create("default", "tvly-abc")
        .await
        .unwrap();

    let response = app
        .oneshot(json_request(
            "PATCH",
            &format!("/api/keys/{}", key.id),
            Some(&token),
            json!({ "name": "production" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["name"], "production");
    assert_eq!(body["value"], "tvly-abc");
    assert!(state.api_key_service.validate("tvly-abc").await.unwrap().valid);
}

#[tokio::test]
async fn test_delete_then_everything_is_not_found() {
    let (app, state, _) = create_test_app();
    let token = create_test_jwt(&state.config.jwt_signing_key);
    let key = state
        .api_key_service
        .create("default", "tvly-abc")
        .await
        .unwrap();
    let uri = format!("/api/keys/{}", key.id);

    let response = app
        .clone()
        .oneshot(empty_request("DELETE", &uri, Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    for method in ["GET", "DELETE"] {
        let response = app
            .clone()
            .oneshot(empty_request(method, &uri, Some(&token)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{method}");
    }

    let response = app
        .oneshot(json_request(
            "PATCH",
            &uri,
            Some(&token),
            json!({ "name": "again" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["error"], "not_found");
}

#[tokio::test]
async fn test_stats() {
    let (app, state, _) = create_test_app();
    let token = create_test_jwt(&state.config.jwt_signing_key);
    let keys = &state.api_key_service;
    keys.create("a", "sa").await.unwrap();
    keys.create("b", "sb").await.unwrap();
    keys.validate("sa").await.unwrap();
    keys.validate("sa").await.unwrap();
    keys.validate("sb").await.unwrap();

    let response = app
        .oneshot(empty_request("GET", "/api/keys/stats", Some(&token)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!({ "count": 2, "total_usage": 3, "quota": 50 })
    );
}

#[tokio::test]
async fn test_quota_rejects_create() {
    let config = Config {
        api_key_quota: Some(1),
        ..Config::test_default()
    };
    let (app, state, _) = create_test_app_with(config, StaticIdentityProvider::default());
    let token = create_test_jwt(&state.config.jwt_signing_key);
    state.api_key_service.create("a", "sa").await.unwrap();

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/keys",
            Some(&token),
            json!({ "name": "b", "value": "sb" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["error"], "quota_exceeded");
}

#[tokio::test]
async fn test_storage_outage_is_service_unavailable() {
    let (app, state, store) = create_test_app();
    let token = create_test_jwt(&state.config.jwt_signing_key);
    store.set_unavailable(true);

    let response = app
        .oneshot(empty_request("GET", "/api/keys", Some(&token)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = body_json(response).await;
    assert_eq!(body["error"], "storage_unavailable");
    assert!(body.get("details").is_none());
}
