//! Membersync Engine — the reconciliation run orchestrator.

mod engine;

pub use engine::{ReconciliationEngine, RunSummary};
