//! Time access behind a trait so runs stay deterministic.

use chrono::{DateTime, Utc};

/// Source of the current time.
///
/// Nothing in the engine or the API reads `Utc::now()` directly; they ask
/// an injected `Clock`, which tests replace with a pinned instant.
pub trait Clock: Send + Sync {
    /// The current moment in UTC.
    fn now(&self) -> DateTime<Utc>;
}

/// The real clock, used in production wiring.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
