//! Deterministic clock for tests.

use chrono::{DateTime, Utc};

use membersync_core::clock::Clock;

/// A `Clock` pinned to one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
