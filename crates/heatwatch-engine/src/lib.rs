//! Sampling, daily aggregation and heat alerting for Heatwatch.
//!
//! `Aggregator` and `AlertEngine` are plain in-memory state machines.
//! `Scheduler` drives them from a `WeatherSource` on a fixed interval and
//! hands their output to a `RollupSink` and an `AlertSink`.

pub mod aggregator;
pub mod alert;
pub mod scheduler;
pub mod sink;
pub mod types;

pub use aggregator::Aggregator;
pub use alert::AlertEngine;
pub use scheduler::{Scheduler, TickReport};
pub use sink::{AlertSink, RollupSink};
pub use types::{AlertEvent, BucketStatus, DailySummary};
