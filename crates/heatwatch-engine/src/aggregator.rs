//! Per-location, per-day accumulation of readings into daily rollups.
//!
//! A day is finalized purely by sample count: once a (location, day) bucket
//! holds `samples_per_day` readings its summary is emitted and the bucket is
//! dropped. Buckets that never fill are never summarized.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{Duration, NaiveDate};
use heatwatch_core::Config;
use heatwatch_weather::Reading;

use crate::types::{BucketStatus, DailySummary};

#[derive(Debug, Default)]
struct DayBucket {
    temperatures: Vec<f64>,
    conditions: Vec<String>,
}

impl DayBucket {
    fn push(&mut self, temperature: f64, condition: &str) {
        self.temperatures.push(temperature);
        self.conditions.push(condition.to_string());
    }

    fn len(&self) -> usize {
        self.temperatures.len()
    }

    fn average(&self) -> f64 {
        if self.temperatures.is_empty() {
            return 0.0;
        }
        self.temperatures.iter().sum::<f64>() / self.temperatures.len() as f64
    }

    /// Most frequent label; the earliest-seen label wins a tie.
    fn dominant_condition(&self) -> String {
        let mut counts: Vec<(&str, usize)> = Vec::new();
        for condition in &self.conditions {
            match counts.iter_mut().find(|(label, _)| *label == condition.as_str()) {
                Some((_, n)) => *n += 1,
                None => counts.push((condition.as_str(), 1)),
            }
        }

        let mut best: Option<(&str, usize)> = None;
        for (label, n) in counts {
            if best.map_or(true, |(_, top)| n > top) {
                best = Some((label, n));
            }
        }
        best.map(|(label, _)| label.to_string()).unwrap_or_default()
    }

    fn summarize(&self, location: &str, day: NaiveDate) -> DailySummary {
        let max = self.temperatures.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let min = self.temperatures.iter().copied().fold(f64::INFINITY, f64::min);

        DailySummary {
            location: location.to_string(),
            day,
            average_temperature: self.average(),
            max_temperature: max,
            min_temperature: min,
            dominant_condition: self.dominant_condition(),
            sample_count: self.len(),
        }
    }
}

#[derive(Debug, Default)]
struct LocationDays {
    open: BTreeMap<NaiveDate, DayBucket>,
    finalized: BTreeSet<NaiveDate>,
    newest: Option<NaiveDate>,
}

impl LocationDays {
    /// Advance the newest day seen and drop open buckets and finalized
    /// day-keys that fell out of the retention window. Returns false when
    /// `day` itself is too old.
    fn observe(&mut self, day: NaiveDate, retain_days: i64) -> bool {
        let newest = match self.newest {
            Some(newest) if newest >= day => newest,
            _ => {
                self.newest = Some(day);
                day
            }
        };

        let cutoff = newest - Duration::days(retain_days);
        let stale: Vec<NaiveDate> = self.open.range(..cutoff).map(|(d, _)| *d).collect();
        for d in stale {
            if let Some(bucket) = self.open.remove(&d) {
                tracing::debug!(
                    "Dropping unfinished bucket for {} with {} samples",
                    d,
                    bucket.len()
                );
            }
        }

        // days before the cutoff are rejected outright
        self.finalized = self.finalized.split_off(&cutoff);

        day >= cutoff
    }
}

/// Accumulates readings into daily buckets and emits a `DailySummary` when
/// a bucket fills.
#[derive(Debug)]
pub struct Aggregator {
    samples_per_day: usize,
    retain_days: i64,
    locations: HashMap<String, LocationDays>,
}

impl Aggregator {
    pub fn new(samples_per_day: u32, retain_days: u32) -> Self {
        Self {
            samples_per_day: samples_per_day.max(1) as usize,
            retain_days: i64::from(retain_days),
            locations: HashMap::new(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.samples_per_day(), config.retain_days)
    }

    pub fn samples_per_day(&self) -> usize {
        self.samples_per_day
    }

    /// Add one reading. Returns the day's summary on the reading that fills
    /// the bucket, `None` otherwise.
    pub fn record(&mut self, reading: &Reading) -> Option<DailySummary> {
        let day = reading.day_key();
        let days = self.locations.entry(reading.location.clone()).or_default();

        if days.finalized.contains(&day) {
            tracing::debug!(
                "{} already has a summary for {}, ignoring reading",
                reading.location,
                day
            );
            return None;
        }

        if !days.observe(day, self.retain_days) {
            tracing::debug!(
                "Reading for {} on {} is outside the retention window, ignoring",
                reading.location,
                day
            );
            return None;
        }

        let bucket = days.open.entry(day).or_default();
        bucket.push(reading.temperature, &reading.condition);

        if bucket.len() < self.samples_per_day {
            return None;
        }

        let bucket = days.open.remove(&day)?;
        days.finalized.insert(day);
        Some(bucket.summarize(&reading.location, day))
    }

    /// Progress of the most recent open bucket for `location`.
    pub fn status(&self, location: &str) -> Option<BucketStatus> {
        let days = self.locations.get(location)?;
        let (day, bucket) = days.open.iter().next_back()?;

        Some(BucketStatus {
            location: location.to_string(),
            day: *day,
            samples: bucket.len(),
            running_average: bucket.average(),
            conditions: bucket.conditions.clone(),
        })
    }

    /// Open (unfinished) buckets held for `location`.
    pub fn open_buckets(&self, location: &str) -> usize {
        self.locations.get(location).map_or(0, |d| d.open.len())
    }

    pub fn is_finalized(&self, location: &str, day: NaiveDate) -> bool {
        self.locations
            .get(location)
            .is_some_and(|d| d.finalized.contains(&day))
    }
}
