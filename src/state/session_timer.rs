//! Persistent session timer core

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::store::{session_key, TimerStore};
use crate::utils::Clock;

use super::TimerState;

/// A persistent countdown timer for one study session.
///
/// The timer is keyed by session id and backed by a durable store: every state
/// mutation is persisted before the call returns, so a process restart
/// immediately after any control call observes that call's effect. Elapsed
/// wall-clock time that passed while no process was running is reconciled
/// algebraically on [`SessionTimer::attach`].
///
/// Exactly one instance should own a session id at a time; two instances
/// driving the same id (e.g. two server processes over one store) are
/// last-write-wins.
pub struct SessionTimer {
    session_id: String,
    duration_seconds: u64,
    state: Mutex<TimerState>,
    /// Wall-clock moment of the last `pause()`, cleared on resume.
    /// In-memory only; not part of the durable record.
    paused_at: Mutex<Option<DateTime<Utc>>>,
    store: Arc<dyn TimerStore>,
    clock: Arc<dyn Clock>,
    /// Running flag mirror for the tick task; watch so cancellation is prompt
    running_tx: watch::Sender<bool>,
}

impl SessionTimer {
    /// Attach to a session: load the stored record if one exists, otherwise
    /// initialize a fresh one.
    ///
    /// If the record was saved while running, the wall-clock time elapsed
    /// since its `last_update_time` is folded into the active time, clamped to
    /// the session duration: a tick interval cannot fire while no process is
    /// running, so the gap is reconciled algebraically here. A negative gap
    /// (system clock moved backward) counts as zero elapsed.
    ///
    /// An attached timer is never running: the caller must explicitly
    /// `start()` to resume, even right after a `start()` + restart cycle.
    ///
    /// Unreadable or corrupt records fall back to fresh initialization; the
    /// only error is a zero `duration_seconds`.
    pub fn attach(
        session_id: &str,
        duration_seconds: u64,
        store: Arc<dyn TimerStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Arc<Self>, String> {
        if duration_seconds == 0 {
            return Err(format!(
                "Cannot attach session {}: duration must be positive", session_id
            ));
        }

        let now = clock.now();
        let key = session_key(session_id);

        let state = match store.get(&key) {
            Ok(Some(bytes)) => match serde_json::from_slice::<TimerState>(&bytes) {
                Ok(stored) => {
                    Self::reconcile(session_id, duration_seconds, stored, now)
                }
                Err(e) => {
                    warn!("Corrupt timer record for session {}: {}. Starting fresh", session_id, e);
                    TimerState::new(session_id, duration_seconds, now)
                }
            },
            Ok(None) => TimerState::new(session_id, duration_seconds, now),
            Err(e) => {
                warn!("Failed to read timer record for session {}: {}. Starting fresh", session_id, e);
                TimerState::new(session_id, duration_seconds, now)
            }
        };

        let (running_tx, _) = watch::channel(false);
        let timer = Arc::new(Self {
            session_id: session_id.to_string(),
            duration_seconds,
            state: Mutex::new(state),
            paused_at: Mutex::new(None),
            store,
            clock,
            running_tx,
        });

        // Persist the reconciled state so a crash right after attach does not
        // replay the same gap twice
        let mut state = timer.lock_state()?;
        timer.persist(&mut state)?;
        drop(state);

        Ok(timer)
    }

    /// Fold the elapsed off-process gap into a stored record.
    ///
    /// The duration passed to `attach` is authoritative when it differs from
    /// the stored one: active time is kept absolute, clamped to the new
    /// duration, and time left is recomputed.
    fn reconcile(
        session_id: &str,
        duration_seconds: u64,
        mut stored: TimerState,
        now: DateTime<Utc>,
    ) -> TimerState {
        if stored.duration_seconds != duration_seconds {
            warn!(
                "Session {} duration changed from {}s to {}s; keeping absolute active time",
                session_id, stored.duration_seconds, duration_seconds
            );
            stored.duration_seconds = duration_seconds;
        }
        stored.active_time_seconds = stored.active_time_seconds.min(duration_seconds);

        if stored.is_running {
            // Clamp to zero when the clock moved backward: never subtract
            // from active time
            let elapsed = (now - stored.last_update_time).num_seconds().max(0) as u64;
            stored.active_time_seconds =
                stored.active_time_seconds.saturating_add(elapsed).min(duration_seconds);
            info!(
                "Session {} was running at last save; reconciled {}s of elapsed time ({}s active)",
                session_id, elapsed, stored.active_time_seconds
            );
        }

        stored.time_left_seconds = duration_seconds - stored.active_time_seconds;
        // A loaded timer never auto-resumes, completed or not
        stored.is_running = false;
        stored
    }

    /// Start (or resume) the timer.
    ///
    /// Sets `start_time` on the first-ever start only. Resuming from a pause
    /// folds the paused wall-clock duration into `total_paused_seconds`.
    /// Calling `start()` while already running has no additional effect, and
    /// starting a completed timer is a no-op until `reset()`.
    pub fn start(&self) -> Result<TimerState, String> {
        let mut state = self.lock_state()?;

        if state.is_running {
            debug!("Session {} timer already running", self.session_id);
            return Ok(state.clone());
        }
        if state.is_complete() {
            warn!("Session {} timer is complete; start ignored until reset", self.session_id);
            return Ok(state.clone());
        }

        let now = self.clock.now();
        if state.start_time.is_none() {
            state.start_time = Some(now);
        }

        let mut paused_at = self.lock_paused_at()?;
        if let Some(paused_since) = paused_at.take() {
            let paused = (now - paused_since).num_seconds().max(0) as u64;
            state.total_paused_seconds = state.total_paused_seconds.saturating_add(paused);
        }
        drop(paused_at);

        state.is_running = true;
        self.persist(&mut state)?;
        info!("Session {} timer started ({}s left)", self.session_id, state.time_left_seconds);

        self.running_tx.send_replace(true);
        Ok(state.clone())
    }

    /// Pause the timer and record the pause marker.
    ///
    /// Idempotent: pausing an already-paused timer changes nothing.
    pub fn pause(&self) -> Result<TimerState, String> {
        let mut state = self.lock_state()?;

        if !state.is_running {
            debug!("Session {} timer already paused", self.session_id);
            return Ok(state.clone());
        }

        state.is_running = false;
        let mut paused_at = self.lock_paused_at()?;
        *paused_at = Some(self.clock.now());
        drop(paused_at);

        self.persist(&mut state)?;
        info!("Session {} timer paused at {}s active", self.session_id, state.active_time_seconds);

        self.running_tx.send_replace(false);
        Ok(state.clone())
    }

    /// Reset the timer to its initial state and delete the durable record.
    ///
    /// The next attach for this session id behaves like a never-before-seen
    /// session.
    pub fn reset(&self) -> Result<TimerState, String> {
        let mut state = self.lock_state()?;
        *state = TimerState::new(&self.session_id, self.duration_seconds, self.clock.now());

        let mut paused_at = self.lock_paused_at()?;
        *paused_at = None;
        drop(paused_at);

        self.store.remove(&session_key(&self.session_id))?;
        info!("Session {} timer reset, durable record removed", self.session_id);

        self.running_tx.send_replace(false);
        Ok(state.clone())
    }

    /// Advance the timer by one second.
    ///
    /// Called by the background tick task while running; a no-op while paused.
    /// Active time never crosses the session duration, and at completion the
    /// timer stops itself.
    pub fn tick(&self) -> Result<TimerState, String> {
        let mut state = self.lock_state()?;

        if !state.is_running {
            return Ok(state.clone());
        }

        state.active_time_seconds =
            state.active_time_seconds.saturating_add(1).min(self.duration_seconds);
        state.time_left_seconds = self.duration_seconds - state.active_time_seconds;

        if state.time_left_seconds == 0 {
            state.is_running = false;
            info!("Session {} timer completed ({}s)", self.session_id, self.duration_seconds);
        }

        self.persist(&mut state)?;

        if !state.is_running {
            self.running_tx.send_replace(false);
        }
        Ok(state.clone())
    }

    /// Get a snapshot of the current timer state
    pub fn snapshot(&self) -> Result<TimerState, String> {
        self.lock_state().map(|state| state.clone())
    }

    /// Session identifier this timer is attached to
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Subscribe to the running flag (used by the tick task)
    pub fn subscribe_running(&self) -> watch::Receiver<bool> {
        self.running_tx.subscribe()
    }

    fn lock_state(&self) -> Result<std::sync::MutexGuard<'_, TimerState>, String> {
        self.state.lock()
            .map_err(|e| format!("Failed to lock timer state: {}", e))
    }

    fn lock_paused_at(&self) -> Result<std::sync::MutexGuard<'_, Option<DateTime<Utc>>>, String> {
        self.paused_at.lock()
            .map_err(|e| format!("Failed to lock pause marker: {}", e))
    }

    /// Persist the record, stamping `last_update_time`.
    /// Runs strictly after every mutation, before the mutating call returns.
    fn persist(&self, state: &mut TimerState) -> Result<(), String> {
        state.last_update_time = self.clock.now();
        let bytes = serde_json::to_vec(&*state)
            .map_err(|e| format!("Failed to serialize timer state: {}", e))?;
        self.store.set(&session_key(&self.session_id), &bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use chrono::{Duration, TimeZone};

    /// Manually advanced clock for deterministic reconciliation tests
    struct ManualClock {
        now: Mutex<DateTime<Utc>>,
    }

    impl ManualClock {
        fn starting_at(now: DateTime<Utc>) -> Arc<Self> {
            Arc::new(Self { now: Mutex::new(now) })
        }

        fn advance(&self, seconds: i64) {
            let mut now = self.now.lock().unwrap();
            *now = *now + Duration::seconds(seconds);
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.now.lock().unwrap()
        }
    }

    fn epoch() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
    }

    fn fixture(duration: u64) -> (Arc<SessionTimer>, Arc<MemoryStore>, Arc<ManualClock>) {
        let store = Arc::new(MemoryStore::new());
        let clock = ManualClock::starting_at(epoch());
        let timer = SessionTimer::attach(
            "s1",
            duration,
            store.clone() as Arc<dyn TimerStore>,
            clock.clone() as Arc<dyn Clock>,
        ).unwrap();
        (timer, store, clock)
    }

    fn assert_sum_invariant(state: &TimerState) {
        assert_eq!(
            state.active_time_seconds + state.time_left_seconds,
            state.duration_seconds
        );
    }

    #[test]
    fn fresh_attach_has_zeroed_not_running_state() {
        let (timer, _store, _clock) = fixture(60);
        let state = timer.snapshot().unwrap();
        assert_eq!(state.active_time_seconds, 0);
        assert_eq!(state.time_left_seconds, 60);
        assert!(!state.is_running);
        assert!(!state.is_complete());
        assert_eq!(state.start_time, None);
        assert_sum_invariant(&state);
    }

    #[test]
    fn attach_rejects_zero_duration() {
        let store = Arc::new(MemoryStore::new());
        let clock = ManualClock::starting_at(epoch());
        let result = SessionTimer::attach("s1", 0, store, clock);
        assert!(result.is_err());
    }

    #[test]
    fn start_is_idempotent_and_sets_start_time_once() {
        let (timer, _store, clock) = fixture(60);

        let first = timer.start().unwrap();
        assert!(first.is_running);
        assert_eq!(first.start_time, Some(epoch()));

        clock.advance(5);
        let second = timer.start().unwrap();
        assert!(second.is_running);
        // Subsequent starts do not move start_time
        assert_eq!(second.start_time, Some(epoch()));
    }

    #[test]
    fn pause_is_idempotent() {
        let (timer, _store, clock) = fixture(60);
        timer.start().unwrap();
        timer.tick().unwrap();

        clock.advance(1);
        let once = timer.pause().unwrap();
        clock.advance(10);
        let twice = timer.pause().unwrap();

        assert_eq!(once.active_time_seconds, twice.active_time_seconds);
        assert_eq!(once.is_running, twice.is_running);
        assert_eq!(once.total_paused_seconds, twice.total_paused_seconds);
    }

    #[test]
    fn ticks_accrue_monotonically_and_freeze_while_paused() {
        let (timer, _store, _clock) = fixture(60);
        timer.start().unwrap();

        let mut previous = 0;
        for _ in 0..5 {
            let state = timer.tick().unwrap();
            assert!(state.active_time_seconds >= previous);
            assert_sum_invariant(&state);
            previous = state.active_time_seconds;
        }
        assert_eq!(previous, 5);

        timer.pause().unwrap();
        let paused = timer.tick().unwrap();
        assert_eq!(paused.active_time_seconds, 5);
    }

    #[test]
    fn resume_accumulates_paused_wall_clock_time() {
        let (timer, _store, clock) = fixture(60);
        timer.start().unwrap();
        timer.tick().unwrap();

        timer.pause().unwrap();
        clock.advance(30);
        let resumed = timer.start().unwrap();

        assert_eq!(resumed.total_paused_seconds, 30);
        assert!(resumed.is_running);
        assert_eq!(resumed.active_time_seconds, 1);
    }

    #[test]
    fn end_to_end_ten_second_session() {
        let (timer, _store, _clock) = fixture(10);
        timer.start().unwrap();

        for _ in 0..3 {
            timer.tick().unwrap();
        }
        let midway = timer.snapshot().unwrap();
        assert_eq!(midway.active_time_seconds, 3);
        assert_eq!(midway.time_left_seconds, 7);
        assert_eq!(midway.progress_percent(), 30);
        assert!(!midway.is_complete());

        for _ in 0..7 {
            timer.tick().unwrap();
        }
        let done = timer.snapshot().unwrap();
        assert_eq!(done.active_time_seconds, 10);
        assert_eq!(done.time_left_seconds, 0);
        assert!(!done.is_running);
        assert!(done.is_complete());

        // Extra ticks never push active time past the duration
        timer.tick().unwrap();
        let after = timer.snapshot().unwrap();
        assert_eq!(after.active_time_seconds, 10);
        assert_sum_invariant(&after);
    }

    #[test]
    fn reattach_reconciles_elapsed_gap_and_clamps_to_completion() {
        let store = Arc::new(MemoryStore::new());
        let clock = ManualClock::starting_at(epoch());

        // Record saved mid-run 45 seconds ago with 30s accrued of a 60s session
        let mut stored = TimerState::new("s1", 60, epoch() - Duration::seconds(45));
        stored.active_time_seconds = 30;
        stored.time_left_seconds = 30;
        stored.is_running = true;
        stored.start_time = Some(epoch() - Duration::seconds(80));
        store.set(&session_key("s1"), &serde_json::to_vec(&stored).unwrap()).unwrap();

        let timer = SessionTimer::attach(
            "s1", 60,
            store as Arc<dyn TimerStore>,
            clock as Arc<dyn Clock>,
        ).unwrap();

        let state = timer.snapshot().unwrap();
        assert_eq!(state.active_time_seconds, 60);
        assert_eq!(state.time_left_seconds, 0);
        assert!(!state.is_running);
        assert!(state.is_complete());
        assert_sum_invariant(&state);
    }

    #[test]
    fn reattach_of_paused_record_loads_values_verbatim() {
        let store = Arc::new(MemoryStore::new());
        let clock = ManualClock::starting_at(epoch());

        let mut stored = TimerState::new("s1", 60, epoch() - Duration::seconds(500));
        stored.active_time_seconds = 12;
        stored.time_left_seconds = 48;
        stored.is_running = false;
        store.set(&session_key("s1"), &serde_json::to_vec(&stored).unwrap()).unwrap();

        let timer = SessionTimer::attach(
            "s1", 60,
            store as Arc<dyn TimerStore>,
            clock as Arc<dyn Clock>,
        ).unwrap();

        let state = timer.snapshot().unwrap();
        // No gap is folded in for a paused record, however old
        assert_eq!(state.active_time_seconds, 12);
        assert_eq!(state.time_left_seconds, 48);
        assert!(!state.is_running);
    }

    #[test]
    fn reattach_never_auto_resumes_a_running_record() {
        let store = Arc::new(MemoryStore::new());
        let clock = ManualClock::starting_at(epoch());

        let mut stored = TimerState::new("s1", 60, epoch() - Duration::seconds(5));
        stored.active_time_seconds = 10;
        stored.time_left_seconds = 50;
        stored.is_running = true;
        store.set(&session_key("s1"), &serde_json::to_vec(&stored).unwrap()).unwrap();

        let timer = SessionTimer::attach(
            "s1", 60,
            store as Arc<dyn TimerStore>,
            clock as Arc<dyn Clock>,
        ).unwrap();

        let state = timer.snapshot().unwrap();
        assert_eq!(state.active_time_seconds, 15);
        assert!(!state.is_running);
        assert!(!state.is_complete());
    }

    #[test]
    fn clock_moved_backward_never_decreases_active_time() {
        let store = Arc::new(MemoryStore::new());
        let clock = ManualClock::starting_at(epoch());

        // last_update_time in the future relative to the current clock
        let mut stored = TimerState::new("s1", 60, epoch() + Duration::seconds(300));
        stored.active_time_seconds = 30;
        stored.time_left_seconds = 30;
        stored.is_running = true;
        store.set(&session_key("s1"), &serde_json::to_vec(&stored).unwrap()).unwrap();

        let timer = SessionTimer::attach(
            "s1", 60,
            store as Arc<dyn TimerStore>,
            clock as Arc<dyn Clock>,
        ).unwrap();

        let state = timer.snapshot().unwrap();
        assert_eq!(state.active_time_seconds, 30);
        assert_sum_invariant(&state);
    }

    #[test]
    fn corrupt_record_falls_back_to_fresh_state() {
        let store = Arc::new(MemoryStore::new());
        let clock = ManualClock::starting_at(epoch());
        store.set(&session_key("s1"), b"not json at all").unwrap();

        let timer = SessionTimer::attach(
            "s1", 60,
            store as Arc<dyn TimerStore>,
            clock as Arc<dyn Clock>,
        ).unwrap();

        let state = timer.snapshot().unwrap();
        assert_eq!(state.active_time_seconds, 0);
        assert_eq!(state.time_left_seconds, 60);
        assert!(!state.is_running);
    }

    #[test]
    fn reset_deletes_the_record_so_reattach_starts_fresh() {
        let store = Arc::new(MemoryStore::new());
        let clock = ManualClock::starting_at(epoch());
        let timer = SessionTimer::attach(
            "s1", 60,
            store.clone() as Arc<dyn TimerStore>,
            clock.clone() as Arc<dyn Clock>,
        ).unwrap();

        timer.start().unwrap();
        for _ in 0..10 {
            timer.tick().unwrap();
        }
        timer.reset().unwrap();

        assert_eq!(store.get(&session_key("s1")).unwrap(), None);

        let state = timer.snapshot().unwrap();
        assert_eq!(state.active_time_seconds, 0);
        assert_eq!(state.time_left_seconds, 60);
        assert_eq!(state.start_time, None);
        assert_eq!(state.total_paused_seconds, 0);
        assert!(!state.is_running);

        let reattached = SessionTimer::attach(
            "s1", 60,
            store as Arc<dyn TimerStore>,
            clock as Arc<dyn Clock>,
        ).unwrap();
        let fresh = reattached.snapshot().unwrap();
        assert_eq!(fresh.active_time_seconds, 0);
        assert_eq!(fresh.time_left_seconds, 60);
    }

    #[test]
    fn duration_change_keeps_absolute_active_time() {
        let store = Arc::new(MemoryStore::new());
        let clock = ManualClock::starting_at(epoch());

        let mut stored = TimerState::new("s1", 60, epoch());
        stored.active_time_seconds = 50;
        stored.time_left_seconds = 10;
        store.set(&session_key("s1"), &serde_json::to_vec(&stored).unwrap()).unwrap();

        // Session reconfigured to 100 seconds: active time carries over
        let timer = SessionTimer::attach(
            "s1", 100,
            store as Arc<dyn TimerStore>,
            clock as Arc<dyn Clock>,
        ).unwrap();

        let state = timer.snapshot().unwrap();
        assert_eq!(state.duration_seconds, 100);
        assert_eq!(state.active_time_seconds, 50);
        assert_eq!(state.time_left_seconds, 50);
        assert_sum_invariant(&state);
    }

    #[test]
    fn start_after_completion_is_ignored_until_reset() {
        let (timer, _store, _clock) = fixture(2);
        timer.start().unwrap();
        timer.tick().unwrap();
        timer.tick().unwrap();

        let state = timer.start().unwrap();
        assert!(!state.is_running);
        assert!(state.is_complete());

        timer.reset().unwrap();
        let restarted = timer.start().unwrap();
        assert!(restarted.is_running);
    }

    #[test]
    fn every_mutation_is_persisted_before_returning() {
        let (timer, store, _clock) = fixture(60);

        timer.start().unwrap();
        let stored: TimerState =
            serde_json::from_slice(&store.get(&session_key("s1")).unwrap().unwrap()).unwrap();
        assert!(stored.is_running);

        timer.tick().unwrap();
        let stored: TimerState =
            serde_json::from_slice(&store.get(&session_key("s1")).unwrap().unwrap()).unwrap();
        assert_eq!(stored.active_time_seconds, 1);

        timer.pause().unwrap();
        let stored: TimerState =
            serde_json::from_slice(&store.get(&session_key("s1")).unwrap().unwrap()).unwrap();
        assert!(!stored.is_running);
    }
}
