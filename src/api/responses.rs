//! API response structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::state::{format_time, TimerState};

/// API response structure for timer control endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse {
    pub status: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub timer: TimerState,
}

impl ApiResponse {
    /// Create a new API response
    pub fn new(status: String, message: String, timer: TimerState) -> Self {
        Self {
            status,
            message,
            timestamp: Utc::now(),
            timer,
        }
    }

    /// Create a response for a running timer
    pub fn running(message: String, timer: TimerState) -> Self {
        Self::new("running".to_string(), message, timer)
    }

    /// Create a response for a stopped (paused/reset/attached) timer
    pub fn stopped(message: String, timer: TimerState) -> Self {
        Self::new("stopped".to_string(), message, timer)
    }
}

/// Request body for attaching a session timer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachRequest {
    /// Planned total session length in seconds
    pub duration_seconds: u64,
}

/// Per-session status: the stored record plus the derived query surface
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStatusResponse {
    pub session_id: String,
    pub timer: TimerState,
    pub progress_percent: u8,
    pub is_complete: bool,
    pub active_time_display: String,
    pub time_left_display: String,
}

impl SessionStatusResponse {
    /// Build the query surface for a timer snapshot
    pub fn from_state(timer: TimerState) -> Self {
        Self {
            session_id: timer.session_id.clone(),
            progress_percent: timer.progress_percent(),
            is_complete: timer.is_complete(),
            active_time_display: format_time(timer.active_time_seconds),
            time_left_display: format_time(timer.time_left_seconds),
            timer,
        }
    }
}

/// Server-wide status response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub attached_sessions: Vec<String>,
    pub uptime: String,
    pub port: u16,
    pub host: String,
    pub last_action: Option<String>,
    pub last_action_time: Option<DateTime<Utc>>,
    pub idle_seconds: u64,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
}

impl HealthResponse {
    /// Create a new health response
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            timestamp: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
