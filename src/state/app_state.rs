//! Main application state management

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Instant,
};
use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::store::TimerStore;
use crate::tasks::session_tick_task;
use crate::utils::Clock;

use super::SessionTimer;

/// Main application state that owns the attached session timers
pub struct AppState {
    /// Durable store shared by all session timers
    pub store: Arc<dyn TimerStore>,
    /// Wall-clock source shared by all session timers
    pub clock: Arc<dyn Clock>,
    /// Timers currently attached in this process, keyed by session id
    sessions: Mutex<HashMap<String, Arc<SessionTimer>>>,
    /// Server metadata
    pub start_time: Instant,
    pub port: u16,
    pub host: String,
    /// Last action tracking
    last_action: Mutex<Option<String>>,
    last_action_time: Mutex<Option<DateTime<Utc>>>,
    /// Last control-activity timestamp, observed by the advisory liveness task
    last_activity: Mutex<DateTime<Utc>>,
}

impl AppState {
    /// Create a new AppState over a store and clock
    pub fn new(
        store: Arc<dyn TimerStore>,
        clock: Arc<dyn Clock>,
        port: u16,
        host: String,
    ) -> Self {
        let now = clock.now();
        Self {
            store,
            clock,
            sessions: Mutex::new(HashMap::new()),
            start_time: Instant::now(),
            port,
            host,
            last_action: Mutex::new(None),
            last_action_time: Mutex::new(None),
            last_activity: Mutex::new(now),
        }
    }

    /// Attach a timer for a session, loading any stored record.
    ///
    /// If the session is already attached in this process the existing timer
    /// is returned unchanged; the stored record is only re-read when a new
    /// attachment is created. Each new attachment gets its own background
    /// tick task, which exits on its own once the timer is dropped.
    pub fn attach_session(
        &self,
        session_id: &str,
        duration_seconds: u64,
    ) -> Result<Arc<SessionTimer>, String> {
        let mut sessions = self.lock_sessions()?;

        if let Some(existing) = sessions.get(session_id) {
            debug!("Session {} already attached, reusing timer", session_id);
            return Ok(Arc::clone(existing));
        }

        let timer = SessionTimer::attach(
            session_id,
            duration_seconds,
            Arc::clone(&self.store),
            Arc::clone(&self.clock),
        )?;
        sessions.insert(session_id.to_string(), Arc::clone(&timer));
        drop(sessions);

        tokio::spawn(session_tick_task(Arc::downgrade(&timer)));
        info!("Attached session {} ({}s planned)", session_id, duration_seconds);

        Ok(timer)
    }

    /// Look up an attached timer by session id
    pub fn get_session(&self, session_id: &str) -> Result<Option<Arc<SessionTimer>>, String> {
        let sessions = self.lock_sessions()?;
        Ok(sessions.get(session_id).cloned())
    }

    /// Session-completion teardown: reset the timer and detach it.
    ///
    /// Returns whether a timer was attached for the id. Dropping the last
    /// strong reference ends the session's tick task.
    pub fn clear_session(&self, session_id: &str) -> Result<bool, String> {
        let mut sessions = self.lock_sessions()?;
        let Some(timer) = sessions.remove(session_id) else {
            return Ok(false);
        };
        drop(sessions);

        timer.reset()?;
        info!("Cleared session {}", session_id);
        Ok(true)
    }

    /// Session ids currently attached in this process
    pub fn attached_sessions(&self) -> Result<Vec<String>, String> {
        let sessions = self.lock_sessions()?;
        let mut ids: Vec<String> = sessions.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }

    /// Record a control action for the status endpoint
    pub fn record_action(&self, action: &str) {
        if let Ok(mut last_action) = self.last_action.lock() {
            *last_action = Some(action.to_string());
        }
        if let Ok(mut last_time) = self.last_action_time.lock() {
            *last_time = Some(self.clock.now());
        }
        self.touch_activity();
    }

    /// Get last action information
    pub fn get_last_action(&self) -> (Option<String>, Option<DateTime<Utc>>) {
        let last_action = self.last_action.lock().ok().and_then(|a| a.clone());
        let last_action_time = self.last_action_time.lock().ok().and_then(|t| *t);
        (last_action, last_action_time)
    }

    /// Note that some control activity happened now
    pub fn touch_activity(&self) {
        if let Ok(mut last_activity) = self.last_activity.lock() {
            *last_activity = self.clock.now();
        }
    }

    /// Seconds since the last observed control activity
    pub fn idle_seconds(&self) -> u64 {
        let last = self.last_activity.lock()
            .map(|t| *t)
            .unwrap_or_else(|_| self.clock.now());
        (self.clock.now() - last).num_seconds().max(0) as u64
    }

    /// Calculate server uptime as a formatted string
    pub fn get_uptime(&self) -> String {
        let duration = self.start_time.elapsed();
        let hours = duration.as_secs() / 3600;
        let minutes = (duration.as_secs() % 3600) / 60;
        let seconds = duration.as_secs() % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}s", seconds)
        }
    }

    fn lock_sessions(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Arc<SessionTimer>>>, String> {
        self.sessions.lock()
            .map_err(|e| format!("Failed to lock session registry: {}", e))
    }
}
