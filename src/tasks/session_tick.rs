//! Session tick background task

use std::{sync::Weak, time::Duration};
use tracing::{debug, error, info};

use crate::state::SessionTimer;

/// Background task that drives one session timer's 1-second tick.
///
/// The task parks until the timer is started, then ticks once per second
/// until the timer pauses, completes, or is dropped. It holds only a weak
/// reference so detaching a session ends its task.
pub async fn session_tick_task(timer: Weak<SessionTimer>) {
    let Some(attached) = timer.upgrade() else {
        return;
    };
    let session_id = attached.session_id().to_string();
    let mut running_rx = attached.subscribe_running();
    drop(attached);

    debug!("Starting tick task for session {}", session_id);

    loop {
        // Park until the timer is started
        while !*running_rx.borrow() {
            if running_rx.changed().await.is_err() {
                debug!("Session {} detached, stopping tick task", session_id);
                return;
            }
        }

        let mut interval = tokio::time::interval(Duration::from_secs(1));
        // The first interval tick completes immediately; skip it so the first
        // second of active time takes a full second to accrue
        interval.tick().await;

        loop {
            tokio::select! {
                // Timer tick - advance active time by one second
                _ = interval.tick() => {
                    let Some(attached) = timer.upgrade() else {
                        debug!("Session {} detached, stopping tick task", session_id);
                        return;
                    };
                    match attached.tick() {
                        Ok(state) => {
                            if !state.is_running {
                                if state.is_complete() {
                                    info!("Session {} reached its target, tick stopped", session_id);
                                }
                                break;
                            }
                        }
                        Err(e) => {
                            error!("Tick failed for session {}: {}", session_id, e);
                        }
                    }
                }

                // Running flag change - pause/reset cancels the tick promptly
                changed = running_rx.changed() => {
                    if changed.is_err() {
                        debug!("Session {} detached, stopping tick task", session_id);
                        return;
                    }
                    if !*running_rx.borrow() {
                        debug!("Session {} paused, tick suspended", session_id);
                        break;
                    }
                }
            }
        }
    }
}
