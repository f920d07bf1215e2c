//! Clock capability, injected rather than read from a global `now()`.
//!
//! The trace buffer uses this for `created_at`/`completed_at` and TTL
//! decisions; the graph store uses it for `last_updated_at`. Tests inject
//! [`ManualClock`] to make eviction and ordering deterministic.

use chrono::{DateTime, Utc};
use std::sync::Arc;

/// A source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The real wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock whose value is set explicitly, for deterministic tests of TTL
/// eviction and `created_at`/`last_updated_at` ordering.
#[derive(Debug, Clone)]
pub struct ManualClock {
    current: Arc<parking_lot::Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            current: Arc::new(parking_lot::Mutex::new(start)),
        }
    }

    pub fn advance(&self, delta: chrono::Duration) {
        let mut guard = self.current.lock();
        *guard += delta;
    }

    pub fn set(&self, when: DateTime<Utc>) {
        *self.current.lock() = when;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.current.lock()
    }
}

pub type SharedClock = Arc<dyn Clock>;

pub fn system_clock() -> SharedClock {
    Arc::new(SystemClock)
}
