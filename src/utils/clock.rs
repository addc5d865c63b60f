//! Wall-clock abstraction

use chrono::{DateTime, Utc};

/// Source of the current instant.
///
/// The timer core never calls `Utc::now()` directly; it reads the clock it was
/// handed at attach time. Tests inject a manually advanced clock to drive
/// reconciliation and pause accounting deterministically.
pub trait Clock: Send + Sync {
    /// Get the current wall-clock time
    fn now(&self) -> DateTime<Utc>;
}

/// System wall clock used by the running server
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
