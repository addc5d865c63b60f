//! Background tasks module
//!
//! This module contains background tasks that run alongside the HTTP server.

pub mod activity_check;
pub mod session_tick;

// Re-export main functions
pub use activity_check::activity_check_task;
pub use session_tick::session_tick_task;
