//! Membersync Groups — external membership surfaces.
//!
//! The two [`ExternalGroup`](membersync_core::group::ExternalGroup)
//! implementations (mailing list and directory), the reconciler that
//! prunes stale group members, and the read-only chat-directory client.

pub mod chat;
pub mod directory;
pub mod mailing_list;
pub mod reconciler;

pub use chat::ChatDirectoryClient;
pub use directory::DirectoryGroup;
pub use mailing_list::MailingListGroup;
pub use reconciler::GroupReconciler;
