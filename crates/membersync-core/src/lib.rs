//! Membersync Core — shared domain abstractions.
//!
//! This crate defines the fundamental types and capability traits that all
//! integration crates depend on. It contains no infrastructure code.

pub mod chat;
pub mod clock;
pub mod error;
pub mod group;
pub mod mailer;
pub mod member;
pub mod registration;
pub mod source;
pub mod store;
