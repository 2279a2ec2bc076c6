//! Process configuration from the environment

use chrono::NaiveTime;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_DIGEST_TIME: &str = "08:00";
const DEFAULT_DIGEST_CONCURRENCY: usize = 4;
const DEFAULT_WEATHER_BASE_URL: &str = "https://api.openweathermap.org";
const DEFAULT_WEATHER_LANG: &str = "en";
const DEFAULT_WEATHER_TIMEOUT_SECS: u64 = 10;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required setting {0}")]
    MissingSetting(&'static str),
    #[error("Invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl ConfigError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Settings for the weather provider client
#[derive(Debug, Clone)]
pub struct WeatherConfig {
    pub api_key: String,
    pub base_url: String,
    /// ISO country code appended to every city query
    pub country: Option<String>,
    pub lang: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct BotConfig {
    pub bot_token: String,
    pub db_path: PathBuf,
    pub legacy_favorites_path: Option<PathBuf>,
    /// Local wall-clock time of the daily digest
    pub digest_time: NaiveTime,
    pub digest_concurrency: usize,
    pub weather: WeatherConfig,
}

impl BotConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    ///
    /// Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let require = |key: &'static str| get(key).ok_or(ConfigError::MissingSetting(key));

        let bot_token = require("BOT_TOKEN")?;
        let api_key = require("WEATHER_API_KEY")?;

        let db_path = get("WEATHER_DB_PATH").map_or_else(
            || {
                let home = get("HOME").unwrap_or_else(|| "/tmp".to_string());
                PathBuf::from(format!("{home}/.weather-digest-bot/favorites.db"))
            },
            PathBuf::from,
        );

        let digest_time = parse_digest_time(
            &get("DIGEST_TIME").unwrap_or_else(|| DEFAULT_DIGEST_TIME.to_string()),
        )?;

        let digest_concurrency = match get("DIGEST_CONCURRENCY") {
            Some(raw) => match raw.trim().parse::<usize>() {
                Ok(0) => return Err(ConfigError::invalid("DIGEST_CONCURRENCY", "must be at least 1")),
                Ok(n) => n,
                Err(e) => return Err(ConfigError::invalid("DIGEST_CONCURRENCY", e.to_string())),
            },
            None => DEFAULT_DIGEST_CONCURRENCY,
        };

        let timeout_secs = match get("WEATHER_TIMEOUT_SECS") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .map_err(|e| ConfigError::invalid("WEATHER_TIMEOUT_SECS", e.to_string()))?,
            None => DEFAULT_WEATHER_TIMEOUT_SECS,
        };

        Ok(Self {
            bot_token,
            db_path,
            legacy_favorites_path: get("LEGACY_FAVORITES_PATH").map(PathBuf::from),
            digest_time,
            digest_concurrency,
            weather: WeatherConfig {
                api_key,
                base_url: get("WEATHER_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_WEATHER_BASE_URL.to_string()),
                country: get("WEATHER_COUNTRY").map(|c| c.trim().to_uppercase()),
                lang: get("WEATHER_LANG").unwrap_or_else(|| DEFAULT_WEATHER_LANG.to_string()),
                timeout: Duration::from_secs(timeout_secs),
            },
        })
    }
}

fn parse_digest_time(raw: &str) -> Result<NaiveTime, ConfigError> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M")
        .map_err(|e| ConfigError::invalid("DIGEST_TIME", format!("expected HH:MM ({e})")))
}
