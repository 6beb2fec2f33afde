//! Periodic driver for the aggregation and alert ticks.
//!
//! Two timers run side by side at the same interval. The aggregation loop
//! owns the `Aggregator` and the alert loop owns the `AlertEngine`, so core
//! state needs no locking. Within a tick all locations are fetched
//! concurrently, then applied to the engine in configured order.

use std::sync::Arc;
use std::time::Duration;

use heatwatch_weather::{Reading, WeatherError, WeatherSource};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::aggregator::Aggregator;
use crate::alert::AlertEngine;
use crate::sink::{AlertSink, RollupSink};

/// What one tick did, for logging and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Locations that produced a reading
    pub fetched: usize,
    /// Locations whose fetch failed and were skipped
    pub failed: usize,
    /// Summaries or alerts produced by the engine
    pub emitted: usize,
    /// Emitted values the sink rejected
    pub sink_failures: usize,
}

pub struct Scheduler<S, R, N> {
    source: Arc<S>,
    rollups: Arc<R>,
    notifier: Arc<N>,
    locations: Vec<String>,
    interval: Duration,
}

impl<S, R, N> Scheduler<S, R, N>
where
    S: WeatherSource + 'static,
    R: RollupSink,
    N: AlertSink,
{
    pub fn new(
        source: Arc<S>,
        rollups: Arc<R>,
        notifier: Arc<N>,
        locations: Vec<String>,
        interval: Duration,
    ) -> Self {
        Self {
            source,
            rollups,
            notifier,
            locations,
            interval,
        }
    }

    /// Run both loops until `shutdown` is cancelled.
    ///
    /// A tick that has started always completes. The engines are handed back
    /// so callers can inspect final state.
    pub async fn run(
        &self,
        aggregator: Aggregator,
        alerts: AlertEngine,
        shutdown: CancellationToken,
    ) -> (Aggregator, AlertEngine) {
        tracing::info!(
            "Scheduler started: {} locations every {:?}",
            self.locations.len(),
            self.interval
        );

        let result = tokio::join!(
            self.run_aggregation(aggregator, shutdown.clone()),
            self.run_alerts(alerts, shutdown),
        );

        tracing::info!("Scheduler stopped");
        result
    }

    async fn run_aggregation(
        &self,
        mut aggregator: Aggregator,
        shutdown: CancellationToken,
    ) -> Aggregator {
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = interval.tick() => {}
            }

            let report = self.aggregation_tick(&mut aggregator).await;
            tracing::debug!("Aggregation tick: {:?}", report);
        }

        aggregator
    }

    async fn run_alerts(&self, mut alerts: AlertEngine, shutdown: CancellationToken) -> AlertEngine {
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = interval.tick() => {}
            }

            let report = self.alert_tick(&mut alerts).await;
            tracing::debug!("Alert tick: {:?}", report);
        }

        alerts
    }

    /// Sample every location once and feed the aggregator.
    pub async fn aggregation_tick(&self, aggregator: &mut Aggregator) -> TickReport {
        tracing::info!("Processing weather data...");
        let mut report = TickReport::default();

        for (location, result) in self.fetch_all().await {
            let reading = match result {
                Ok(reading) => reading,
                Err(e) => {
                    tracing::warn!("No valid data received for {}: {}", location, e);
                    report.failed += 1;
                    continue;
                }
            };
            report.fetched += 1;

            let summary = aggregator.record(&reading);

            if let Some(status) = aggregator.status(&location) {
                tracing::debug!(
                    "{} on {}: {} samples, average {:.2}°C, conditions [{}]",
                    status.location,
                    status.day,
                    status.samples,
                    status.running_average,
                    status.conditions.join(", ")
                );
            }

            let Some(summary) = summary else {
                continue;
            };
            report.emitted += 1;

            match self.rollups.append(&summary).await {
                Ok(()) => {
                    tracing::info!("Stored daily summary for {} on {}", summary.location, summary.day);
                }
                Err(e) => {
                    report.sink_failures += 1;
                    tracing::error!(
                        "Failed to store daily summary for {} on {}: {}",
                        summary.location,
                        summary.day,
                        e
                    );
                }
            }
        }

        report
    }

    /// Sample every location once and feed the alert engine.
    pub async fn alert_tick(&self, alerts: &mut AlertEngine) -> TickReport {
        tracing::info!("Checking alerts...");
        let mut report = TickReport::default();

        for (location, result) in self.fetch_all().await {
            let reading = match result {
                Ok(reading) => reading,
                Err(e) => {
                    tracing::warn!("No valid data received for {}: {}", location, e);
                    report.failed += 1;
                    continue;
                }
            };
            report.fetched += 1;

            let Some(event) = alerts.check(&reading) else {
                continue;
            };
            report.emitted += 1;

            tracing::warn!(
                "Alert: {} temperature has exceeded {}°C for {} consecutive updates ({:.2}°C)",
                event.location,
                event.threshold,
                event.consecutive,
                event.temperature
            );

            match self.notifier.send(&event).await {
                Ok(()) => tracing::info!("Alert sent for {}", event.location),
                Err(e) => {
                    report.sink_failures += 1;
                    tracing::error!("Failed to send alert for {}: {}", event.location, e);
                }
            }
        }

        report
    }

    /// Fetch all locations concurrently. Results come back in configured
    /// order, one per location; a panicking fetch is reported as a failed
    /// fetch for its own location.
    async fn fetch_all(&self) -> Vec<(String, Result<Reading, WeatherError>)> {
        let handles: Vec<_> = self
            .locations
            .iter()
            .map(|location| {
                let source = Arc::clone(&self.source);
                let location = location.clone();
                tokio::spawn(async move { source.fetch(&location).await })
            })
            .collect();

        let mut results = Vec::with_capacity(handles.len());
        for (location, handle) in self.locations.iter().zip(handles) {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => {
                    tracing::error!("Fetch task for {} failed: {}", location, e);
                    Err(WeatherError::NoData(location.clone()))
                }
            };
            results.push((location.clone(), result));
        }
        results
    }
}
