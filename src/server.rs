//! HTTP caller layer for the publish pipeline.
//!
//! Thin by design: it validates the wire payload, reports a missing
//! token as a configuration error before the pipeline runs, and maps
//! each `PublishError` variant to a status code. The wire format
//! (`code`, `projectName`, `repoUrl`, `branch`) is camelCase.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use tower_http::cors::CorsLayer;

use crate::config::Settings;
use crate::errors::PublishError;
use crate::publish::{PublishRequest, Publisher};

// ── Shared application state ──────────────────────────────────────────

pub struct AppState {
    /// Present only when a GitHub token is configured.
    pub publisher: Option<Publisher>,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            publisher: settings.github_token.clone().map(Publisher::new),
        }
    }
}

// ── Request payload types ─────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushRequestBody {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub project_name: String,
    #[serde(default)]
    pub repo_url: String,
    pub branch: Option<String>,
}

// ── Error handling ────────────────────────────────────────────────────

pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(serde_json::json!({ "message": self.message }))).into_response()
    }
}

/// Map pipeline failures onto transport status codes. `RemoteFailure`
/// passes the origin status through when GitHub supplied one.
impl From<PublishError> for ApiError {
    fn from(err: PublishError) -> Self {
        let status = match &err {
            PublishError::Unauthorized => StatusCode::UNAUTHORIZED,
            PublishError::InvalidReference { .. } => StatusCode::BAD_REQUEST,
            PublishError::RemoteFailure { status, .. } => status
                .and_then(|s| StatusCode::from_u16(s).ok())
                .unwrap_or(StatusCode::BAD_GATEWAY),
            PublishError::TransportFailure(_) => StatusCode::BAD_GATEWAY,
            PublishError::LocalOperation { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, err.to_string())
    }
}

// ── Router ────────────────────────────────────────────────────────────

pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/api/github/push", post(push_to_github))
        .route("/health", get(health_check))
        .route("/", get(welcome))
        .with_state(state)
}

// ── Handlers ──────────────────────────────────────────────────────────

async fn push_to_github(
    State(state): State<SharedState>,
    Json(body): Json<PushRequestBody>,
) -> Result<impl IntoResponse, ApiError> {
    if body.code.is_empty() || body.project_name.is_empty() || body.repo_url.is_empty() {
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            "Missing required fields: code, projectName, or repoUrl.",
        ));
    }

    // Configuration is checked before any network or filesystem action.
    let publisher = state.publisher.as_ref().ok_or_else(|| {
        ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "GitHub token is not configured",
        )
    })?;

    let receipt = publisher
        .publish(PublishRequest {
            code: body.code,
            project_name: body.project_name,
            target: body.repo_url,
            branch: body.branch,
        })
        .await?;

    Ok((StatusCode::OK, Json(receipt)))
}

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn welcome() -> impl IntoResponse {
    Json(serde_json::json!({
        "success": true,
        "message": "gitship publish service is running",
        "status": "active",
    }))
}

// ── Server lifecycle ──────────────────────────────────────────────────

pub async fn start_server(settings: Settings) -> Result<()> {
    let state = Arc::new(AppState::from_settings(&settings));
    let app = build_router(state).layer(CorsLayer::permissive());

    let addr = settings.bind_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;

    tracing::info!(%addr, token = %settings.redacted_token(), "gitship listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("server shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    tracing::info!("shutdown signal received");
}
