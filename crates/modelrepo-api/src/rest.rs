//! REST API handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use modelrepo_core::{resolve_version, RepoError, VersionSpec, VersionTag};
use modelrepo_store::{ModelArtifact, ModelRepository};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Repository shared by every handler
pub type SharedRepository = Arc<dyn ModelRepository<Model = ModelArtifact>>;

/// Application state shared across handlers
pub struct AppState {
    pub repository: SharedRepository,
}

/// Create the API router
pub fn create_router(repository: SharedRepository) -> Router {
    let state = Arc::new(AppState { repository });

    Router::new()
        .route("/health", get(health))
        .route("/api/v1/models/:name/versions", get(list_versions))
        .route("/api/v1/models/:name/versions/:version", get(has_model))
        .route("/api/v1/models/:name/versions/:version/load", post(load_model))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

type ApiError = (StatusCode, String);

/// Map repository errors onto HTTP responses
fn error_response(err: RepoError) -> ApiError {
    match err {
        RepoError::ModelNotFound { .. } => {
            (StatusCode::NOT_FOUND, format!("Model unavailable: {}", err))
        }
        RepoError::InvalidVersion(_) | RepoError::InvalidModelName(_) => {
            (StatusCode::BAD_REQUEST, err.to_string())
        }
        _ => {
            error!(error = %err, "Repository request failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "An unexpected error occurred. Please try again later.".to_string(),
            )
        }
    }
}

fn parse_version(version: &str) -> Result<VersionSpec, ApiError> {
    version.parse().map_err(error_response)
}

/// Health response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub repository: String,
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        repository: state.repository.name().to_string(),
    })
}

/// Versions available for a model
#[derive(Debug, Serialize, Deserialize)]
pub struct VersionsResponse {
    pub name: String,
    pub versions: Vec<VersionTag>,
}

async fn list_versions(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<VersionsResponse>, ApiError> {
    let versions = state
        .repository
        .list_versions(&name)
        .await
        .map_err(error_response)?;

    Ok(Json(VersionsResponse { name, versions }))
}

/// Availability of one model version
#[derive(Debug, Serialize, Deserialize)]
pub struct AvailabilityResponse {
    pub name: String,
    pub version: String,
    pub available: bool,
}

async fn has_model(
    State(state): State<Arc<AppState>>,
    Path((name, version)): Path<(String, String)>,
) -> Result<Json<AvailabilityResponse>, ApiError> {
    let spec = parse_version(&version)?;
    let available = state
        .repository
        .has_model(&name, spec)
        .await
        .map_err(error_response)?;

    Ok(Json(AvailabilityResponse {
        name,
        version: spec.to_string(),
        available,
    }))
}

/// Result of loading a model
#[derive(Debug, Serialize, Deserialize)]
pub struct LoadResponse {
    pub name: String,
    pub version: String,
    pub size_bytes: usize,
    pub digest: String,
}

async fn load_model(
    State(state): State<Arc<AppState>>,
    Path((name, version)): Path<(String, String)>,
) -> Result<Json<LoadResponse>, ApiError> {
    let spec = parse_version(&version)?;

    // Pin `latest` first so the response names the version that was served
    let resolved = match spec {
        VersionSpec::Exact(tag) => tag,
        VersionSpec::Latest => {
            let versions = state
                .repository
                .list_versions(&name)
                .await
                .map_err(error_response)?;
            resolve_version(&name, spec, &versions).map_err(error_response)?
        }
    };

    info!(name = %name, requested = %spec, version = %resolved, "Loading model");

    let model = state
        .repository
        .get_model(&name, resolved.into())
        .await
        .map_err(error_response)?;

    Ok(Json(LoadResponse {
        name,
        version: resolved.to_string(),
        size_bytes: model.len(),
        digest: model.digest().to_string(),
    }))
}
