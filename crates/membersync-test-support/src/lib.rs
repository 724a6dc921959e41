//! Shared test mocks and utilities for the membersync engine.

mod chat;
mod clock;
mod group;
mod mailer;
mod source;
mod store;
mod token;

pub use chat::StaticChatDirectory;
pub use clock::FixedClock;
pub use group::{FailingGroup, RecordingGroup};
pub use mailer::{FailingMailer, RecordingMailer};
pub use source::{FailingRegistrationSource, StaticRegistrationSource};
pub use store::{InMemoryMemberStore, InMemoryWatermarkStore};
pub use token::StaticTokenProvider;
