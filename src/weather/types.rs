//! Weather data types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Current conditions for a city
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSummary {
    pub city: String,
    pub description: String,
    pub temperature_c: f64,
    pub feels_like_c: f64,
    pub humidity_pct: u8,
    pub wind_speed_mps: f64,
}

impl fmt::Display for WeatherSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Weather in {}:", self.city)?;
        writeln!(f, "🌡 Temperature: {:.1}°C", self.temperature_c)?;
        writeln!(f, "🌡 Feels like: {:.1}°C", self.feels_like_c)?;
        writeln!(f, "💧 Humidity: {}%", self.humidity_pct)?;
        writeln!(f, "💨 Wind speed: {:.1} m/s", self.wind_speed_mps)?;
        write!(f, "☁️ {}", capitalize(&self.description))
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
