//! Weather provider abstraction
//!
//! Resolves a city name to a human-readable summary of current conditions.

mod error;
mod openweather;
mod types;

pub use error::{WeatherError, LOOKUP_FAILED_REPLY};
pub use openweather::OpenWeatherService;
pub use types::WeatherSummary;

use crate::runtime::WeatherResolver;
use async_trait::async_trait;

/// Logging wrapper for weather resolvers
pub struct LoggingResolver<W> {
    inner: W,
}

impl<W: WeatherResolver> LoggingResolver<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<W: WeatherResolver> WeatherResolver for LoggingResolver<W> {
    async fn resolve(&self, city: &str) -> Result<WeatherSummary, WeatherError> {
        let start = std::time::Instant::now();
        let result = self.inner.resolve(city).await;
        let duration = start.elapsed();

        match &result {
            Ok(summary) => {
                tracing::info!(
                    city = %city,
                    duration_ms = %duration.as_millis(),
                    temperature_c = summary.temperature_c,
                    "Weather lookup completed"
                );
            }
            Err(WeatherError::CityNotFound(_)) => {
                tracing::info!(
                    city = %city,
                    duration_ms = %duration.as_millis(),
                    "Weather lookup found no such city"
                );
            }
            Err(e) => {
                tracing::error!(
                    city = %city,
                    duration_ms = %duration.as_millis(),
                    error = %e,
                    "Weather lookup failed"
                );
            }
        }

        result
    }
}
