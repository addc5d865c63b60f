//! Sled-backed durable store implementation

use std::path::Path;

use tracing::info;

use super::TimerStore;

/// Durable store backed by an embedded sled database.
///
/// Every write is flushed before returning so that a process restart
/// immediately after a control call still observes that call's effect.
pub struct SledStore {
    db: sled::Db,
}

impl SledStore {
    /// Open (or create) the database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let db = sled::open(path.as_ref())?;
        info!("Opened timer store at {}", path.as_ref().display());
        Ok(Self { db })
    }
}

impl TimerStore for SledStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, String> {
        self.db.get(key)
            .map(|value| value.map(|ivec| ivec.to_vec()))
            .map_err(|e| format!("Failed to read key {}: {}", key, e))
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), String> {
        self.db.insert(key, value)
            .map_err(|e| format!("Failed to write key {}: {}", key, e))?;
        self.db.flush()
            .map_err(|e| format!("Failed to flush store after writing {}: {}", key, e))?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), String> {
        self.db.remove(key)
            .map_err(|e| format!("Failed to remove key {}: {}", key, e))?;
        self.db.flush()
            .map_err(|e| format!("Failed to flush store after removing {}: {}", key, e))?;
        Ok(())
    }
}
