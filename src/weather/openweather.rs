//! `OpenWeatherMap` current-conditions client

use super::{WeatherError, WeatherSummary};
use crate::config::WeatherConfig;
use crate::runtime::WeatherResolver;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;

const CURRENT_WEATHER_PATH: &str = "/data/2.5/weather";

/// `OpenWeatherMap` service implementation
pub struct OpenWeatherService {
    client: Client,
    api_key: String,
    endpoint: String,
    country: Option<String>,
    lang: String,
}

impl OpenWeatherService {
    pub fn new(config: &WeatherConfig) -> Result<Self, WeatherError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| WeatherError::provider(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            endpoint: format!(
                "{}{CURRENT_WEATHER_PATH}",
                config.base_url.trim_end_matches('/')
            ),
            country: config.country.clone(),
            lang: config.lang.clone(),
        })
    }

    fn query_for(&self, city: &str) -> String {
        match &self.country {
            Some(country) => format!("{city},{country}"),
            None => city.to_string(),
        }
    }

    fn classify_error(city: &str, status: StatusCode, body: &str) -> WeatherError {
        match status.as_u16() {
            404 => WeatherError::CityNotFound(city.to_string()),
            401 => WeatherError::provider(format!("Authentication failed: {body}")),
            429 => WeatherError::provider(format!("Rate limited: {body}")),
            _ => WeatherError::provider(format!("HTTP {status}: {body}")),
        }
    }

    fn normalize_response(city: &str, resp: CurrentWeatherResponse) -> WeatherSummary {
        let description = resp
            .weather
            .into_iter()
            .next()
            .map(|w| w.description)
            .unwrap_or_default();

        WeatherSummary {
            city: city.to_string(),
            description,
            temperature_c: resp.main.temp,
            feels_like_c: resp.main.feels_like,
            humidity_pct: resp.main.humidity,
            wind_speed_mps: resp.wind.speed,
        }
    }
}

#[async_trait]
impl WeatherResolver for OpenWeatherService {
    async fn resolve(&self, city: &str) -> Result<WeatherSummary, WeatherError> {
        let query = self.query_for(city);
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("q", query.as_str()),
                ("appid", self.api_key.as_str()),
                ("units", "metric"),
                ("lang", self.lang.as_str()),
            ])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    WeatherError::provider(format!("Request timeout: {e}"))
                } else if e.is_connect() {
                    WeatherError::provider(format!("Connection failed: {e}"))
                } else {
                    WeatherError::provider(format!("Request failed: {e}"))
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| WeatherError::provider(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(Self::classify_error(city, status, &body));
        }

        let parsed: CurrentWeatherResponse = serde_json::from_str(&body).map_err(|e| {
            WeatherError::provider(format!("Failed to parse response: {e} - body: {body}"))
        })?;

        Ok(Self::normalize_response(city, parsed))
    }
}

// OpenWeatherMap API types

#[derive(Debug, Deserialize)]
struct CurrentWeatherResponse {
    #[serde(default)]
    weather: Vec<ConditionEntry>,
    main: MainReadings,
    wind: WindReadings,
}

#[derive(Debug, Deserialize)]
struct ConditionEntry {
    description: String,
}

#[derive(Debug, Deserialize)]
struct MainReadings {
    temp: f64,
    feels_like: f64,
    humidity: u8,
}

#[derive(Debug, Deserialize)]
struct WindReadings {
    speed: f64,
}
