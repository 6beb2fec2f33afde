use std::sync::Arc;

use anyhow::Result;
use heatwatch_core::{AppError, Config};
use heatwatch_engine::{Aggregator, AlertEngine, Scheduler};
use heatwatch_notify::Notifier;
use heatwatch_store::RollupStore;
use heatwatch_weather::OpenWeatherClient;
use tokio_util::sync::CancellationToken;

type App = Scheduler<OpenWeatherClient, RollupStore, Notifier>;

/// Wire the provider, store and notifier. Any failure here is fatal.
fn build(config: &Config) -> Result<App, AppError> {
    let api_key = config.api_key()?;

    let source = OpenWeatherClient::new(&config.provider, api_key)
        .map_err(|e| AppError::Service(format!("weather client: {}", e)))?;

    let store = RollupStore::open(&config.store.path).map_err(|e| {
        AppError::Service(format!("rollup store {}: {}", config.store.path.display(), e))
    })?;

    let notifier = Notifier::from_config(&config.notify)
        .map_err(|e| AppError::Service(format!("notifier: {}", e)))?;

    tracing::info!(
        "Storing rollups in {}, alerts via {:?}",
        config.store.path.display(),
        notifier.kind()
    );

    Ok(Scheduler::new(
        Arc::new(source),
        Arc::new(store),
        Arc::new(notifier),
        config.locations.clone(),
        config.poll_interval(),
    ))
}

#[tokio::main]
async fn main() -> Result<()> {
    heatwatch_core::init()?;

    let (config, _) = Config::load_validated().map_err(AppError::from)?;
    let app = match build(&config) {
        Ok(app) => app,
        Err(e) => {
            tracing::error!("Startup failed: {}", e);
            return Err(e.into());
        }
    };

    tracing::info!(
        "Threshold {}°C over {} consecutive updates, {} samples per day",
        config.temperature_threshold,
        config.alert_trigger_count,
        config.samples_per_day()
    );

    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            return;
        }
        tracing::info!("Shutdown requested, finishing current tick");
        signal.cancel();
    });

    app.run(
        Aggregator::from_config(&config),
        AlertEngine::from_config(&config),
        shutdown,
    )
    .await;

    Ok(())
}
