//! Consecutive-breach alerting.
//!
//! Each location carries a counter of back-to-back readings strictly above
//! the threshold. A counter of zero means no streak; reaching the trigger
//! count fires one `AlertEvent` and resets the counter, so a new alert needs
//! a fresh streak. Failed fetches never reach the engine and leave the
//! counter as it was.

use std::collections::HashMap;

use heatwatch_core::Config;
use heatwatch_weather::Reading;

use crate::types::AlertEvent;

#[derive(Debug)]
pub struct AlertEngine {
    threshold: f64,
    trigger_count: u32,
    counters: HashMap<String, u32>,
}

impl AlertEngine {
    pub fn new(threshold: f64, trigger_count: u32) -> Self {
        Self {
            threshold,
            trigger_count: trigger_count.max(1),
            counters: HashMap::new(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.temperature_threshold, config.alert_trigger_count)
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn trigger_count(&self) -> u32 {
        self.trigger_count
    }

    /// Feed one successful reading. Returns at most one event.
    pub fn check(&mut self, reading: &Reading) -> Option<AlertEvent> {
        let counter = self.counters.entry(reading.location.clone()).or_insert(0);

        if reading.temperature > self.threshold {
            *counter += 1;
        } else {
            *counter = 0;
            return None;
        }

        if *counter < self.trigger_count {
            tracing::debug!(
                "{} above {}°C for {} of {} readings",
                reading.location,
                self.threshold,
                counter,
                self.trigger_count
            );
            return None;
        }

        *counter = 0;
        Some(AlertEvent {
            location: reading.location.clone(),
            temperature: reading.temperature,
            threshold: self.threshold,
            consecutive: self.trigger_count,
            sampled_at: reading.sampled_at,
        })
    }

    /// Current streak length for `location`; zero when unknown.
    pub fn counter(&self, location: &str) -> u32 {
        self.counters.get(location).copied().unwrap_or(0)
    }
}
