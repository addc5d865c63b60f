//! Timer state record and query helpers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Durable timer record, one per study session.
///
/// This is exactly the shape written to the store: `session_id` and
/// `duration_seconds` are echoed into the record for diagnostics, and
/// `last_update_time` is what makes catch-up reconciliation possible after a
/// restart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerState {
    /// Partition key; one record per study session
    pub session_id: String,
    /// Planned total session length, fixed at creation
    pub duration_seconds: u64,
    /// Accumulated time counted as studied, 0..=duration_seconds
    pub active_time_seconds: u64,
    /// `duration_seconds - active_time_seconds`, kept redundant for display
    pub time_left_seconds: u64,
    /// Whether the timer was counting at last save
    pub is_running: bool,
    /// First time `start()` was called; immutable until `reset()`
    pub start_time: Option<DateTime<Utc>>,
    /// Cumulative paused wall-clock seconds since `start_time` (informational)
    pub total_paused_seconds: u64,
    /// Wall-clock moment this record was last persisted
    pub last_update_time: DateTime<Utc>,
}

impl TimerState {
    /// Create a fresh, not-running record for a session
    pub fn new(session_id: &str, duration_seconds: u64, now: DateTime<Utc>) -> Self {
        Self {
            session_id: session_id.to_string(),
            duration_seconds,
            active_time_seconds: 0,
            time_left_seconds: duration_seconds,
            is_running: false,
            start_time: None,
            total_paused_seconds: 0,
            last_update_time: now,
        }
    }

    /// Completion percentage, rounded and clamped to 0..=100
    pub fn progress_percent(&self) -> u8 {
        if self.duration_seconds == 0 {
            return 0;
        }
        let percent = (self.active_time_seconds as f64 / self.duration_seconds as f64) * 100.0;
        percent.round().min(100.0) as u8
    }

    /// Whether the session target has been reached.
    ///
    /// Stays true once reached (active time never decreases) until `reset()`.
    pub fn is_complete(&self) -> bool {
        self.time_left_seconds == 0 || self.progress_percent() >= 100
    }
}

/// Format a second count as zero-padded `MM:SS`.
///
/// No hour rollover: minutes may exceed 59. Session durations are bounded to
/// a few hours, so `75:00` reads better than introducing an hours field.
pub fn format_time(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_time_pads_and_never_rolls_over_to_hours() {
        assert_eq!(format_time(0), "00:00");
        assert_eq!(format_time(5), "00:05");
        assert_eq!(format_time(125), "02:05");
        assert_eq!(format_time(3600), "60:00");
    }

    #[test]
    fn progress_rounds_and_clamps() {
        let now = Utc::now();
        let mut state = TimerState::new("s1", 60, now);
        assert_eq!(state.progress_percent(), 0);
        assert!(!state.is_complete());

        state.active_time_seconds = 20;
        assert_eq!(state.progress_percent(), 33);

        state.active_time_seconds = 59;
        assert_eq!(state.progress_percent(), 98);

        state.active_time_seconds = 60;
        state.time_left_seconds = 0;
        assert_eq!(state.progress_percent(), 100);
        assert!(state.is_complete());
    }

    #[test]
    fn record_round_trips_through_json() {
        let now = Utc::now();
        let mut state = TimerState::new("s1", 1500, now);
        state.active_time_seconds = 90;
        state.time_left_seconds = 1410;
        state.start_time = Some(now);

        let bytes = serde_json::to_vec(&state).unwrap();
        let decoded: TimerState = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(decoded, state);
    }
}
