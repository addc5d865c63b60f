//! Advisory activity-liveness background task

use std::{sync::Arc, time::Duration};
use tokio::time::interval;
use tracing::debug;

use crate::state::AppState;

/// Idle periods shorter than this are not worth logging
const IDLE_LOG_THRESHOLD_SECONDS: u64 = 120;

/// Background task that observes control-activity liveness.
///
/// Advisory only: it reports how long the server has gone without a control
/// call but never gates or pauses accrual. Pausing timers on client idleness
/// would change the counted study time, so it is deliberately not done here.
pub async fn activity_check_task(state: Arc<AppState>, check_interval_seconds: u64) {
    debug!("Starting activity check task ({}s interval)", check_interval_seconds);

    let mut interval = interval(Duration::from_secs(check_interval_seconds));

    loop {
        interval.tick().await;

        let idle = state.idle_seconds();
        if idle >= IDLE_LOG_THRESHOLD_SECONDS {
            debug!("No control activity for {}s", idle);
        }
    }
}
