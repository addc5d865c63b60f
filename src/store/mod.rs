//! Durable key-value store module
//!
//! The timer core persists its state through the `TimerStore` trait so it can
//! run (and be tested) without committing to a concrete storage engine.

pub mod memory;
pub mod sled_store;

// Re-export main types
pub use memory::MemoryStore;
pub use sled_store::SledStore;

/// Durable key-value store contract consumed by the timer core.
///
/// Operations are synchronous and local. A `set` that returns `Ok` must be
/// visible to a `get` in a freshly started process, so a reload immediately
/// after any control call observes that call's effect.
pub trait TimerStore: Send + Sync {
    /// Read the serialized record for a key, if one exists
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, String>;

    /// Write the serialized record for a key
    fn set(&self, key: &str, value: &[u8]) -> Result<(), String>;

    /// Delete the record for a key (no-op if absent)
    fn remove(&self, key: &str) -> Result<(), String>;
}

/// Derive the namespaced store key for a session identifier
pub fn session_key(session_id: &str) -> String {
    format!("session_timer:{}", session_id)
}
