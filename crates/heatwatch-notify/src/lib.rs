//! Alert delivery for Heatwatch.
//!
//! Provides a log-only notifier and a Gmail API mailer behind one
//! `Notifier` handle chosen from configuration.

pub mod error;
pub mod gmail;
pub mod message;
pub mod notifier;

pub use error::NotifyError;
pub use gmail::GmailNotifier;
pub use message::AlertMessage;
pub use notifier::{LogNotifier, Notifier};
