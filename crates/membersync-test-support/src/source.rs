//! Test registration sources — mock `RegistrationSource` implementations.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use membersync_core::error::SyncError;
use membersync_core::registration::RegistrationEvent;
use membersync_core::source::RegistrationSource;

/// A registration source that returns a fixed batch of events and records
/// the requested windows.
#[derive(Debug)]
pub struct StaticRegistrationSource {
    events: Vec<RegistrationEvent>,
    windows: Mutex<Vec<(DateTime<Utc>, DateTime<Utc>)>>,
}

impl StaticRegistrationSource {
    /// Creates a source returning `events` from every fetch.
    #[must_use]
    pub fn new(events: Vec<RegistrationEvent>) -> Self {
        Self {
            events,
            windows: Mutex::new(Vec::new()),
        }
    }

    /// The `[from, to]` windows requested so far.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn requested_windows(&self) -> Vec<(DateTime<Utc>, DateTime<Utc>)> {
        self.windows.lock().unwrap().clone()
    }
}

#[async_trait]
impl RegistrationSource for StaticRegistrationSource {
    async fn fetch_registrations(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<RegistrationEvent>, SyncError> {
        self.windows.lock().unwrap().push((from, to));
        Ok(self.events.clone())
    }
}

/// A registration source whose fetch always fails after exhausting its
/// retry budget.
#[derive(Debug)]
pub struct FailingRegistrationSource;

#[async_trait]
impl RegistrationSource for FailingRegistrationSource {
    async fn fetch_registrations(
        &self,
        _from: DateTime<Utc>,
        _to: DateTime<Utc>,
    ) -> Result<Vec<RegistrationEvent>, SyncError> {
        Err(SyncError::RetryExhausted {
            service: "registration-source".to_owned(),
            attempts: 5,
            message: "HTTP 503".to_owned(),
        })
    }
}
