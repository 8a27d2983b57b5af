// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Key-gated repository endpoint for external key holders.
//!
//! Requests are checked in order: `x-api-key` present, `repoUrl` present,
//! `repoUrl` names a GitHub repository, then the key is validated and
//! metered. Only a request that reaches the last step counts as a use.

use crate::error::{AppError, Result};
use crate::middleware::api_key::PresentedApiKey;
use crate::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/github-summarizer", post(summarize_repo))
}

#[derive(Deserialize)]
pub struct RepoRequest {
    #[serde(rename = "repoUrl", default)]
    repo_url: Option<String>,
}

#[derive(Debug, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct RepoResponse {
    pub success: bool,
    pub message: String,
    #[serde(rename = "repoName")]
    pub repo_name: String,
}

async fn summarize_repo(
    State(state): State<Arc<AppState>>,
    api_key: PresentedApiKey,
    body: std::result::Result<Json<RepoRequest>, JsonRejection>,
) -> Result<Json<RepoResponse>> {
    let repo_url = body
        .ok()
        .and_then(|Json(body)| body.repo_url)
        .filter(|url| !url.trim().is_empty())
        .ok_or_else(|| AppError::MissingInput("repoUrl".to_string()))?;

    let (owner, repo) = parse_github_repo(&repo_url)?;

    api_key.authorize(&state.api_key_service).await?;

    let repo_name = format!("{}/{}", owner, repo);
    tracing::info!(repo = %repo_name, "Repository request accepted");

    Ok(Json(RepoResponse {
        success: true,
        message: "Repository accepted".to_string(),
        repo_name,
    }))
}

/// `https://github.com/{owner}/{repo}[/...]` -> `(owner, repo)`.
fn parse_github_repo(raw: &str) -> Result<(String, String)> {
    let url = Url::parse(raw.trim())
        .map_err(|_| AppError::BadRequest("Invalid URL provided".to_string()))?;

    let invalid = || AppError::BadRequest("Invalid GitHub repository URL format".to_string());
    if url.host_str() != Some("github.com") {
        return Err(invalid());
    }

    let mut segments = url
        .path_segments()
        .into_iter()
        .flatten()
        .filter(|s| !s.is_empty());
    match (segments.next(), segments.next()) {
        (Some(owner), Some(repo)) => Ok((owner.to_string(), repo.to_string())),
        _ => Err(invalid()),
    }
}
