//! Execution context threaded through a filter run.
//!
//! Carries the wall-clock instant used for ignore-rule expiry and a shared
//! cancellation flag checked before each policy evaluation. Tests pin the
//! clock to a fixed instant to make expiry deterministic.

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct FilterContext {
    now: DateTime<Utc>,
    cancelled: Arc<AtomicBool>,
}

impl FilterContext {
    pub fn new() -> Self {
        Self::fixed(Utc::now())
    }

    /// A context whose clock always reads `now`.
    pub fn fixed(now: DateTime<Utc>) -> Self {
        Self {
            now,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    /// Request cooperative cancellation. The filter observes the flag at its
    /// next policy evaluation and aborts; clones of this context share it.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

impl Default for FilterContext {
    fn default() -> Self {
        Self::new()
    }
}
