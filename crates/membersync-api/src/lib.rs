//! Membersync API — HTTP surface of the reconciliation engine.
//!
//! One operational endpoint (trigger a run, guarded by a shared secret)
//! plus a health check. The engine itself lives in `membersync-engine`;
//! this crate only wires configuration, the connection pool, and the
//! production clients together.
//!
//! Runs must not overlap. The server does not serialize concurrent
//! triggers; the external scheduler is responsible for spacing them out.

pub mod config;
pub mod error;
pub mod routes;
pub mod state;
