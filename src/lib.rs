//! Study Timer - A state-managed HTTP server for persistent study session timers
//!
//! This library tracks per-session study timers that survive process restarts:
//! timer state is persisted to a durable key-value store after every change,
//! and wall-clock time that elapsed while no process was running is reconciled
//! on reattach. A thin HTTP API exposes the control operations (attach, start,
//! pause, reset, clear) and the read-only query surface.
//!
//! Known limitation: nothing coordinates two server processes driving the same
//! session id over one store; concurrent writers are last-write-wins.

pub mod config;
pub mod state;
pub mod store;
pub mod api;
pub mod tasks;
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use state::{format_time, AppState, SessionTimer, TimerState};
pub use store::{MemoryStore, SledStore, TimerStore};
pub use api::create_router;
pub use utils::signals::shutdown_signal;
