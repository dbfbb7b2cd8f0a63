//! Process-wide event trace toggle
//!
//! When enabled, the worker emits one `info!` line per handled event
//! (`READ`, `WRITE`, `RESET`, `STOP`). Has no effect on behavior.

use std::sync::atomic::{AtomicBool, Ordering};

use tracing::info;

static EVENT_LOGGING: AtomicBool = AtomicBool::new(false);

/// Turn per-event trace lines on or off for every worker in the process
pub fn set_event_logging(enabled: bool) {
    EVENT_LOGGING.store(enabled, Ordering::Relaxed);
}

/// Whether per-event trace lines are currently enabled
pub fn event_logging_enabled() -> bool {
    EVENT_LOGGING.load(Ordering::Relaxed)
}

pub(crate) fn trace_event(worker_id: u64, event: &'static str) {
    if event_logging_enabled() {
        info!(worker_id, "StateHolder {}", event);
    }
}
