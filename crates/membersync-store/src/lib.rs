//! Membersync Store — PostgreSQL implementations of the persistence
//! capabilities.

pub mod pg_member_store;
pub mod pg_watermark_store;
pub mod schema;

pub use pg_member_store::PgMemberStore;
pub use pg_watermark_store::PgWatermarkStore;
