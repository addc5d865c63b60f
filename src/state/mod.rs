//! State management module
//!
//! This module contains the persistent timer core and the application state
//! that owns attached timers.

pub mod app_state;
pub mod session_timer;
pub mod timer_state;

// Re-export main types
pub use app_state::AppState;
pub use session_timer::SessionTimer;
pub use timer_state::{format_time, TimerState};
