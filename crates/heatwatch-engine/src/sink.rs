//! Output seams of the engine.
//!
//! Both sinks are append-only: the engine hands a value over and never reads
//! it back. A sink error is logged by the scheduler and the value is dropped.

use std::future::Future;

use crate::types::{AlertEvent, DailySummary};

/// Persists finalized daily summaries.
pub trait RollupSink: Send + Sync {
    type Error: std::fmt::Display + Send;

    fn append(&self, summary: &DailySummary)
        -> impl Future<Output = Result<(), Self::Error>> + Send;
}

/// Delivers alert events to a human.
pub trait AlertSink: Send + Sync {
    type Error: std::fmt::Display + Send;

    fn send(&self, event: &AlertEvent) -> impl Future<Output = Result<(), Self::Error>> + Send;
}
