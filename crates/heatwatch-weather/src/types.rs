use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Offset between Kelvin and Celsius
pub const KELVIN_OFFSET: f64 = 273.15;

pub fn kelvin_to_celsius(kelvin: f64) -> f64 {
    kelvin - KELVIN_OFFSET
}

/// One sample of current conditions for a location, in Celsius.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub location: String,
    pub temperature: f64,
    pub feels_like: f64,
    /// Provider condition group, e.g. "Clear", "Rain", "Clouds"
    pub condition: String,
    pub sampled_at: DateTime<Utc>,
}

impl Reading {
    /// UTC calendar date of the sample; the daily rollup grouping key.
    pub fn day_key(&self) -> NaiveDate {
        self.sampled_at.date_naive()
    }
}

/// Weather source errors. Any of these means "no reading this tick".
#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Invalid API key")]
    InvalidApiKey,
    #[error("Location not found: {0}")]
    LocationNotFound(String),
    #[error("Weather API error: {status} - {message}")]
    Api { status: u16, message: String },
    #[error("No data available for {0}")]
    NoData(String),
    #[error("Parse error: {0}")]
    Parse(String),
}
