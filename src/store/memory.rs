//! In-memory store implementation

use std::collections::HashMap;
use std::sync::Mutex;

use super::TimerStore;

/// HashMap-backed store for tests and ephemeral runs.
///
/// Not durable across restarts; the server uses [`super::SledStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    /// Create an empty in-memory store
    pub fn new() -> Self {
        Self::default()
    }
}

impl TimerStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, String> {
        let entries = self.entries.lock()
            .map_err(|e| format!("Failed to lock store entries: {}", e))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), String> {
        let mut entries = self.entries.lock()
            .map_err(|e| format!("Failed to lock store entries: {}", e))?;
        entries.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), String> {
        let mut entries = self.entries.lock()
            .map_err(|e| format!("Failed to lock store entries: {}", e))?;
        entries.remove(key);
        Ok(())
    }
}
