//! Centralized error types for Heatwatch.
//!
//! Each collaborator crate owns its own error enum (fetch, store, notify).
//! `AppError` covers what can stop the process before scheduling starts;
//! every variant is fatal.

use thiserror::Error;

/// Top-level application error type.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Collaborator failures (client, store, notifier) surfaced at startup.
    #[error("Service error: {0}")]
    Service(String),
}

/// Configuration errors. Always fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Configuration parse error: {0}")]
    ParseError(String),

    #[error("Missing required setting: {0}")]
    MissingSetting(String),
}
