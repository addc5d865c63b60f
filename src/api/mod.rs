//! HTTP API module
//!
//! This module contains all HTTP endpoint handlers and response structures.

pub mod handlers;
pub mod responses;

use std::sync::Arc;
use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;
use handlers::*;

/// Create the HTTP router with all endpoints
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/sessions/:session_id/attach", post(attach_handler))
        .route("/sessions/:session_id/start", post(start_handler))
        .route("/sessions/:session_id/pause", post(pause_handler))
        .route("/sessions/:session_id/reset", post(reset_handler))
        .route("/sessions/:session_id", delete(clear_session_handler))
        .route("/sessions/:session_id/status", get(session_status_handler))
        .route("/status", get(status_handler))
        .route("/health", get(health_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
