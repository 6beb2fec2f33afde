//! Weather source for Heatwatch
//!
//! Fetches current conditions per location from OpenWeatherMap and turns
//! them into Celsius `Reading`s for the engine.

pub mod provider;
pub mod retry;
pub mod types;

pub use provider::{OpenWeatherClient, WeatherSource};
pub use retry::RetryPolicy;
pub use types::*;
