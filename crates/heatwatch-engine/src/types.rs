use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Finalized statistics for one location-day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySummary {
    pub location: String,
    pub day: NaiveDate,
    pub average_temperature: f64,
    pub max_temperature: f64,
    pub min_temperature: f64,
    pub dominant_condition: String,
    pub sample_count: usize,
}

/// Raised when a location stays above the threshold for the configured
/// number of consecutive readings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertEvent {
    pub location: String,
    /// Temperature of the reading that completed the streak
    pub temperature: f64,
    pub threshold: f64,
    /// Length of the streak that fired, equal to the trigger count
    pub consecutive: u32,
    pub sampled_at: DateTime<Utc>,
}

/// Progress of the open bucket for a location.
#[derive(Debug, Clone, PartialEq)]
pub struct BucketStatus {
    pub location: String,
    pub day: NaiveDate,
    pub samples: usize,
    pub running_average: f64,
    pub conditions: Vec<String>,
}
