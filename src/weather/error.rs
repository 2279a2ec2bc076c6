//! Weather provider error types

use thiserror::Error;

/// Reply for any lookup that could not produce weather
pub const LOOKUP_FAILED_REPLY: &str = "Failed to get the weather, please try again later";

/// Failure to resolve a city to current conditions
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WeatherError {
    /// The provider has no match for the city
    #[error("City not found: {0}")]
    CityNotFound(String),
    /// Provider unreachable, timed out, failed or returned garbage
    #[error("Weather provider error: {0}")]
    Provider(String),
}

impl WeatherError {
    pub fn provider(message: impl Into<String>) -> Self {
        Self::Provider(message.into())
    }

    /// Reply shown to the user for this failure
    pub fn user_message(&self) -> &'static str {
        match self {
            WeatherError::CityNotFound(_) => "City not found",
            WeatherError::Provider(_) => LOOKUP_FAILED_REPLY,
        }
    }
}
