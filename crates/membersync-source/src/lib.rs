//! Membersync Source — registration-source integration.
//!
//! Fetches registration actions from the payment/registration platform's
//! campaign feeds and normalizes them into
//! [`RegistrationEvent`](membersync_core::registration::RegistrationEvent)s.

pub mod auth;
pub mod client;
mod mapping;

pub use auth::OAuthTokenProvider;
pub use client::HelloFormsClient;
