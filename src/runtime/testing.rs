//! Mock implementations for testing
//!
//! These mocks enable coordinator and digest tests without real I/O.

use super::traits::*;
use crate::db::FavoriteRecord;
use crate::state_machine::UserId;
use crate::weather::{WeatherError, WeatherSummary};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;
use tokio::sync::Notify;

// ============================================================================
// In-memory Favorite Store
// ============================================================================

/// Favorite store backed by a map, with a switch to simulate an outage
#[derive(Default)]
pub struct InMemoryStore {
    favorites: Mutex<BTreeMap<UserId, String>>,
    unavailable: Mutex<bool>,
    upserts: Mutex<usize>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a favorite without counting it as an upsert
    pub fn insert(&self, user: UserId, city: impl Into<String>) {
        self.favorites.lock().unwrap().insert(user, city.into());
    }

    /// Make every operation fail with `StoreError::Unavailable`
    pub fn set_unavailable(&self, unavailable: bool) {
        *self.unavailable.lock().unwrap() = unavailable;
    }

    /// Number of successful upserts
    pub fn upsert_count(&self) -> usize {
        *self.upserts.lock().unwrap()
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if *self.unavailable.lock().unwrap() {
            Err(StoreError::Unavailable("mock outage".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl FavoriteStore for InMemoryStore {
    async fn get(&self, user: UserId) -> Result<Option<String>, StoreError> {
        self.check_available()?;
        Ok(self.favorites.lock().unwrap().get(&user).cloned())
    }

    async fn upsert(&self, user: UserId, city: &str) -> Result<(), StoreError> {
        self.check_available()?;
        self.favorites.lock().unwrap().insert(user, city.to_string());
        *self.upserts.lock().unwrap() += 1;
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<FavoriteRecord>, StoreError> {
        self.check_available()?;
        Ok(self
            .favorites
            .lock()
            .unwrap()
            .iter()
            .map(|(user, city)| FavoriteRecord::new(*user, city.clone()))
            .collect())
    }
}

// ============================================================================
// Mock Weather Resolver
// ============================================================================

/// Resolver with a fixed set of known cities; anything else is not found
#[derive(Default)]
pub struct MockWeather {
    known: HashSet<String>,
    failures: HashMap<String, WeatherError>,
    /// Every city passed to `resolve`, in call order
    lookups: Mutex<Vec<String>>,
}

impl MockWeather {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_city(mut self, city: impl Into<String>) -> Self {
        self.known.insert(city.into());
        self
    }

    /// Fail lookups of `city` with `error`
    pub fn with_failure(mut self, city: impl Into<String>, error: WeatherError) -> Self {
        self.failures.insert(city.into(), error);
        self
    }

    pub fn lookups(&self) -> Vec<String> {
        self.lookups.lock().unwrap().clone()
    }

    pub fn summary_for(city: &str) -> WeatherSummary {
        WeatherSummary {
            city: city.to_string(),
            description: "clear sky".to_string(),
            temperature_c: 21.5,
            feels_like_c: 20.0,
            humidity_pct: 40,
            wind_speed_mps: 2.5,
        }
    }
}

#[async_trait]
impl WeatherResolver for MockWeather {
    async fn resolve(&self, city: &str) -> Result<WeatherSummary, WeatherError> {
        self.lookups.lock().unwrap().push(city.to_string());
        if let Some(error) = self.failures.get(city) {
            return Err(error.clone());
        }
        if self.known.contains(city) {
            Ok(Self::summary_for(city))
        } else {
            Err(WeatherError::CityNotFound(city.to_string()))
        }
    }
}

// ============================================================================
// Gated Weather Resolver (for concurrency testing)
// ============================================================================

/// Wraps a resolver and holds lookups of one city until released
pub struct GatedWeather {
    inner: MockWeather,
    gated_city: String,
    entered: Notify,
    gate: Notify,
}

impl GatedWeather {
    pub fn new(inner: MockWeather, gated_city: impl Into<String>) -> Self {
        Self {
            inner,
            gated_city: gated_city.into(),
            entered: Notify::new(),
            gate: Notify::new(),
        }
    }

    /// Wait until a lookup of the gated city is blocked in the resolver
    pub async fn wait_until_entered(&self) {
        self.entered.notified().await;
    }

    /// Let one blocked lookup proceed
    pub fn release(&self) {
        self.gate.notify_one();
    }
}

#[async_trait]
impl WeatherResolver for GatedWeather {
    async fn resolve(&self, city: &str) -> Result<WeatherSummary, WeatherError> {
        if city == self.gated_city {
            self.entered.notify_one();
            self.gate.notified().await;
        }
        self.inner.resolve(city).await
    }
}

// ============================================================================
// Recording Message Sender
// ============================================================================

/// Sender that records every message and can fail for chosen users
#[derive(Default)]
pub struct RecordingSender {
    sent: Mutex<Vec<(UserId, String)>>,
    failing: Mutex<HashSet<UserId>>,
}

impl RecordingSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every send to `user` fail
    pub fn fail_for(&self, user: UserId) {
        self.failing.lock().unwrap().insert(user);
    }

    /// All successfully sent messages, in send order
    pub fn sent(&self) -> Vec<(UserId, String)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn messages_for(&self, user: UserId) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter(|(to, _)| *to == user)
            .map(|(_, text)| text)
            .collect()
    }
}

#[async_trait]
impl MessageSender for RecordingSender {
    async fn send_message(&self, user: UserId, text: &str) -> Result<(), SendError> {
        if self.failing.lock().unwrap().contains(&user) {
            return Err(SendError::new(user, "mock: bot was blocked by the user"));
        }
        self.sent.lock().unwrap().push((user, text.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_store_outage() {
        let store = InMemoryStore::new();
        store.insert(UserId(1), "Rome");
        store.set_unavailable(true);

        assert!(store.get(UserId(1)).await.is_err());
        assert!(store.upsert(UserId(1), "Oslo").await.is_err());
        assert!(store.list_all().await.is_err());

        store.set_unavailable(false);
        assert_eq!(store.get(UserId(1)).await.unwrap().as_deref(), Some("Rome"));
        assert_eq!(store.upsert_count(), 0);
    }

    #[tokio::test]
    async fn test_mock_weather_records_lookups() {
        let weather = MockWeather::new()
            .with_city("Rome")
            .with_failure("Lima", WeatherError::provider("down"));

        assert!(weather.resolve("Rome").await.is_ok());
        assert_eq!(
            weather.resolve("Lima").await.unwrap_err(),
            WeatherError::provider("down")
        );
        assert!(matches!(
            weather.resolve("Nowhere").await,
            Err(WeatherError::CityNotFound(_))
        ));
        assert_eq!(weather.lookups(), vec!["Rome", "Lima", "Nowhere"]);
    }

    #[tokio::test]
    async fn test_recording_sender_failures() {
        let sender = RecordingSender::new();
        sender.fail_for(UserId(2));

        sender.send_message(UserId(1), "hi").await.unwrap();
        assert!(sender.send_message(UserId(2), "hi").await.is_err());
        assert_eq!(sender.sent(), vec![(UserId(1), "hi".to_string())]);
    }
}
