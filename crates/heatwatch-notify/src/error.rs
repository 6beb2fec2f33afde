//! Notifier error types.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Notifier not configured: {0}")]
    NotConfigured(String),

    #[error("Token expired")]
    TokenExpired,

    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    #[error("Send failed: {0}")]
    SendFailed(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}
