use super::state::AppState;
use crate::session::SessionOptions;
use crate::upload::seed_transcript;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize, Default)]
pub struct StartSessionRequest {
    /// Run against the local simulator instead of the live backend
    pub simulate: Option<bool>,

    /// Backend session id for keyword biasing
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StartSessionResponse {
    pub status: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct StopSessionResponse {
    pub status: String,
    pub item_count: usize,
}

#[derive(Debug, Deserialize)]
pub struct SeedFileRequest {
    /// Path of the audio file to transcribe
    pub path: String,

    pub session_id: Option<String>,

    /// Keywords to bias recognition toward
    #[serde(default)]
    pub bias_keywords: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct SeedFileResponse {
    pub session_id: String,
    pub item_count: usize,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /session/start
/// Start the recording session
pub async fn start_session(
    State(state): State<AppState>,
    body: Option<Json<StartSessionRequest>>,
) -> impl IntoResponse {
    let Json(req) = body.unwrap_or_default();

    if state.orchestrator.is_active().await {
        return (
            StatusCode::CONFLICT,
            Json(ErrorResponse {
                error: "a recording session is already active".to_string(),
            }),
        )
            .into_response();
    }

    let options = SessionOptions {
        simulate: req.simulate.unwrap_or(false),
        remote_session_id: req.session_id,
    };

    match state.orchestrator.start(options).await {
        Ok(()) => (
            StatusCode::OK,
            Json(StartSessionResponse {
                status: "recording".to_string(),
                message: "Recording session started".to_string(),
            }),
        )
            .into_response(),
        Err(e) => {
            error!("Failed to start session: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: format!("Failed to start session: {}", e),
                }),
            )
                .into_response()
        }
    }
}

/// POST /session/stop
/// Stop the active recording session
pub async fn stop_session(State(state): State<AppState>) -> impl IntoResponse {
    match state.orchestrator.stop().await {
        Ok(()) => {
            let item_count = state.store.item_count().await;
            info!("Session stopped ({} transcript items)", item_count);
            (
                StatusCode::OK,
                Json(StopSessionResponse {
                    status: "stopped".to_string(),
                    item_count,
                }),
            )
                .into_response()
        }
        Err(e) => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: e.to_string(),
            }),
        )
            .into_response(),
    }
}

/// GET /session/status
pub async fn session_status(State(state): State<AppState>) -> impl IntoResponse {
    let status = state.orchestrator.status().await;
    (StatusCode::OK, Json(status)).into_response()
}

/// GET /transcript
/// Finalized items plus the current interim caption
pub async fn get_transcript(State(state): State<AppState>) -> impl IntoResponse {
    let snapshot = state.store.snapshot().await;
    (StatusCode::OK, Json(snapshot)).into_response()
}

/// POST /transcript/clear
pub async fn clear_transcript(State(state): State<AppState>) -> impl IntoResponse {
    state.store.clear().await;
    info!("Transcript cleared");
    StatusCode::NO_CONTENT.into_response()
}

/// POST /transcript/seed-file
/// Transcribe an audio file through the upload collaborator and replace the
/// transcript with the result.
pub async fn seed_from_file(
    State(state): State<AppState>,
    Json(req): Json<SeedFileRequest>,
) -> impl IntoResponse {
    let path = std::path::PathBuf::from(&req.path);
    match state
        .uploader
        .transcribe_file(&path, req.session_id.as_deref(), &req.bias_keywords)
        .await
    {
        Ok(response) => {
            seed_transcript(&state.store, &response).await;
            let item_count = state.store.item_count().await;
            info!("Transcript seeded from {} ({} items)", req.path, item_count);
            (
                StatusCode::OK,
                Json(SeedFileResponse {
                    session_id: response.session_id,
                    item_count,
                }),
            )
                .into_response()
        }
        Err(e) => {
            error!("File transcription failed: {}", e);
            (
                StatusCode::BAD_GATEWAY,
                Json(ErrorResponse {
                    error: e.to_string(),
                }),
            )
                .into_response()
        }
    }
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
