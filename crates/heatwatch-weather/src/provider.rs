//! OpenWeatherMap current-conditions client.

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use heatwatch_core::ProviderConfig;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::instrument;

use crate::retry::{with_retry, RetryPolicy};
use crate::types::{kelvin_to_celsius, Reading, WeatherError};

const USER_AGENT: &str = "Heatwatch/0.1.0";

/// Anything that can produce the current reading for a location name.
///
/// The scheduler is generic over this so tests can script readings.
pub trait WeatherSource: Send + Sync {
    fn fetch(&self, location: &str) -> impl Future<Output = Result<Reading, WeatherError>> + Send;
}

#[derive(Debug, Deserialize)]
struct CurrentWeatherResponse {
    main: Option<MainBlock>,
    #[serde(default)]
    weather: Vec<ConditionBlock>,
    dt: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct MainBlock {
    temp: f64,
    feels_like: f64,
}

#[derive(Debug, Deserialize)]
struct ConditionBlock {
    main: String,
}

impl CurrentWeatherResponse {
    fn into_reading(self, location: &str) -> Result<Reading, WeatherError> {
        let main = self
            .main
            .ok_or_else(|| WeatherError::NoData(location.to_string()))?;

        let sampled_at = self
            .dt
            .and_then(|dt| DateTime::<Utc>::from_timestamp(dt, 0))
            .ok_or_else(|| WeatherError::NoData(location.to_string()))?;

        let condition = self
            .weather
            .into_iter()
            .next()
            .map(|w| w.main)
            .unwrap_or_else(|| "Unknown".to_string());

        Ok(Reading {
            location: location.to_string(),
            temperature: kelvin_to_celsius(main.temp),
            feels_like: kelvin_to_celsius(main.feels_like),
            condition,
            sampled_at,
        })
    }
}

/// OpenWeatherMap client keyed by city name.
#[derive(Debug, Clone)]
pub struct OpenWeatherClient {
    client: Client,
    base_url: String,
    api_key: String,
    retry: RetryPolicy,
}

impl OpenWeatherClient {
    pub fn new(config: &ProviderConfig, api_key: &str) -> Result<Self, WeatherError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            retry: RetryPolicy::from_config(config),
        })
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Fetch current conditions for `location`, converted to Celsius.
    #[instrument(skip(self), level = "debug")]
    pub async fn current(&self, location: &str) -> Result<Reading, WeatherError> {
        let url = format!("{}/data/2.5/weather", self.base_url);

        let response = with_retry(&self.retry, || {
            self.client
                .get(&url)
                .query(&[("q", location), ("appid", self.api_key.as_str())])
                .send()
        })
        .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(WeatherError::InvalidApiKey);
        }
        if status == StatusCode::NOT_FOUND {
            return Err(WeatherError::LocationNotFound(location.to_string()));
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(WeatherError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: CurrentWeatherResponse = response
            .json()
            .await
            .map_err(|e| WeatherError::Parse(e.to_string()))?;

        let reading = body.into_reading(location)?;
        tracing::debug!(
            "Data received for {}: {:.2}°C ({}), feels like {:.2}°C",
            location,
            reading.temperature,
            reading.condition,
            reading.feels_like
        );
        Ok(reading)
    }
}

impl WeatherSource for OpenWeatherClient {
    fn fetch(&self, location: &str) -> impl Future<Output = Result<Reading, WeatherError>> + Send {
        self.current(location)
    }
}
