//! Membersync Notify — administrative email notifications.

pub mod service;
pub mod transactional_mailer;

pub use service::NotificationService;
pub use transactional_mailer::TransactionalMailer;
