//! HTTP endpoint handlers

use std::sync::Arc;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use tracing::{error, info, warn};

use crate::state::{AppState, SessionTimer};
use super::responses::{
    ApiResponse, AttachRequest, HealthResponse, SessionStatusResponse, StatusResponse,
};

/// Look up an attached session or fail with 404
fn attached_session(
    state: &AppState,
    session_id: &str,
) -> Result<Arc<SessionTimer>, StatusCode> {
    match state.get_session(session_id) {
        Ok(Some(timer)) => Ok(timer),
        Ok(None) => {
            warn!("Session {} is not attached", session_id);
            Err(StatusCode::NOT_FOUND)
        }
        Err(e) => {
            error!("Failed to look up session {}: {}", session_id, e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Handle POST /sessions/:session_id/attach - Attach (load or create) a timer
pub async fn attach_handler(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    Json(request): Json<AttachRequest>,
) -> Result<Json<ApiResponse>, StatusCode> {
    state.record_action("attach");

    if request.duration_seconds == 0 {
        warn!("Rejecting attach for session {}: zero duration", session_id);
        return Err(StatusCode::BAD_REQUEST);
    }

    match state.attach_session(&session_id, request.duration_seconds) {
        Ok(timer) => {
            let snapshot = timer.snapshot().map_err(|e| {
                error!("Failed to read timer state for session {}: {}", session_id, e);
                StatusCode::INTERNAL_SERVER_ERROR
            })?;
            info!("Attach endpoint called for session {}", session_id);
            Ok(Json(ApiResponse::stopped(
                format!("Session {} attached", session_id),
                snapshot,
            )))
        }
        Err(e) => {
            error!("Failed to attach session {}: {}", session_id, e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Handle POST /sessions/:session_id/start - Start or resume the timer
pub async fn start_handler(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Json<ApiResponse>, StatusCode> {
    state.record_action("start");
    let timer = attached_session(&state, &session_id)?;

    match timer.start() {
        Ok(snapshot) => {
            info!("Start endpoint called for session {}", session_id);
            if snapshot.is_running {
                Ok(Json(ApiResponse::running(
                    format!("Session {} timer running", session_id),
                    snapshot,
                )))
            } else {
                // Completed timers ignore start until reset
                Ok(Json(ApiResponse::stopped(
                    format!("Session {} timer is complete", session_id),
                    snapshot,
                )))
            }
        }
        Err(e) => {
            error!("Failed to start session {}: {}", session_id, e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Handle POST /sessions/:session_id/pause - Pause the timer
pub async fn pause_handler(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Json<ApiResponse>, StatusCode> {
    state.record_action("pause");
    let timer = attached_session(&state, &session_id)?;

    match timer.pause() {
        Ok(snapshot) => {
            info!("Pause endpoint called for session {}", session_id);
            Ok(Json(ApiResponse::stopped(
                format!("Session {} timer paused", session_id),
                snapshot,
            )))
        }
        Err(e) => {
            error!("Failed to pause session {}: {}", session_id, e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Handle POST /sessions/:session_id/reset - Reset the timer and its record
pub async fn reset_handler(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Json<ApiResponse>, StatusCode> {
    state.record_action("reset");
    let timer = attached_session(&state, &session_id)?;

    match timer.reset() {
        Ok(snapshot) => {
            info!("Reset endpoint called for session {}", session_id);
            Ok(Json(ApiResponse::stopped(
                format!("Session {} timer reset", session_id),
                snapshot,
            )))
        }
        Err(e) => {
            error!("Failed to reset session {}: {}", session_id, e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Handle DELETE /sessions/:session_id - Reset and detach (session teardown)
pub async fn clear_session_handler(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<StatusCode, StatusCode> {
    state.record_action("clear");

    match state.clear_session(&session_id) {
        Ok(true) => {
            info!("Clear endpoint called for session {}", session_id);
            Ok(StatusCode::NO_CONTENT)
        }
        Ok(false) => {
            warn!("Clear endpoint called for unknown session {}", session_id);
            Err(StatusCode::NOT_FOUND)
        }
        Err(e) => {
            error!("Failed to clear session {}: {}", session_id, e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Handle GET /sessions/:session_id/status - The timer query surface
pub async fn session_status_handler(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionStatusResponse>, StatusCode> {
    let timer = attached_session(&state, &session_id)?;

    let snapshot = timer.snapshot().map_err(|e| {
        error!("Failed to read timer state for session {}: {}", session_id, e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    Ok(Json(SessionStatusResponse::from_state(snapshot)))
}

/// Handle GET /status - Return current server status
pub async fn status_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<StatusResponse>, StatusCode> {
    let attached_sessions = state.attached_sessions().map_err(|e| {
        error!("Failed to list attached sessions: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    let (last_action, last_action_time) = state.get_last_action();

    Ok(Json(StatusResponse {
        attached_sessions,
        uptime: state.get_uptime(),
        port: state.port,
        host: state.host.clone(),
        last_action,
        last_action_time,
        idle_seconds: state.idle_seconds(),
    }))
}

/// Handle GET /health - Health check endpoint
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}
