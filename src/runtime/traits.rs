//! Trait abstractions for runtime I/O
//!
//! These traits enable testing the coordinator and the digest with mock
//! implementations.

use crate::db::{Database, DbError, FavoriteRecord};
use crate::state_machine::UserId;
use crate::weather::{WeatherError, WeatherSummary};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// The favorite store could not be read or written
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Favorite storage unavailable: {0}")]
    Unavailable(String),
}

impl From<DbError> for StoreError {
    fn from(e: DbError) -> Self {
        StoreError::Unavailable(e.to_string())
    }
}

/// A message could not be delivered to a user
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Failed to send message to {user}: {reason}")]
pub struct SendError {
    pub user: UserId,
    pub reason: String,
}

impl SendError {
    pub fn new(user: UserId, reason: impl Into<String>) -> Self {
        Self {
            user,
            reason: reason.into(),
        }
    }
}

/// Durable favorite-city storage
#[async_trait]
pub trait FavoriteStore: Send + Sync {
    /// The user's favorite city, if any
    async fn get(&self, user: UserId) -> Result<Option<String>, StoreError>;

    /// Insert or replace the user's favorite city
    async fn upsert(&self, user: UserId, city: &str) -> Result<(), StoreError>;

    /// Snapshot of every favorite, ordered by user id
    async fn list_all(&self) -> Result<Vec<FavoriteRecord>, StoreError>;
}

/// Resolves a city name to current conditions
#[async_trait]
pub trait WeatherResolver: Send + Sync {
    async fn resolve(&self, city: &str) -> Result<WeatherSummary, WeatherError>;
}

/// Outbound chat messages
#[async_trait]
pub trait MessageSender: Send + Sync {
    async fn send_message(&self, user: UserId, text: &str) -> Result<(), SendError>;
}

// ============================================================================
// Arc implementations for trait objects
// ============================================================================

#[async_trait]
impl<T: FavoriteStore + ?Sized> FavoriteStore for Arc<T> {
    async fn get(&self, user: UserId) -> Result<Option<String>, StoreError> {
        (**self).get(user).await
    }

    async fn upsert(&self, user: UserId, city: &str) -> Result<(), StoreError> {
        (**self).upsert(user, city).await
    }

    async fn list_all(&self) -> Result<Vec<FavoriteRecord>, StoreError> {
        (**self).list_all().await
    }
}

#[async_trait]
impl<T: WeatherResolver + ?Sized> WeatherResolver for Arc<T> {
    async fn resolve(&self, city: &str) -> Result<WeatherSummary, WeatherError> {
        (**self).resolve(city).await
    }
}

#[async_trait]
impl<T: MessageSender + ?Sized> MessageSender for Arc<T> {
    async fn send_message(&self, user: UserId, text: &str) -> Result<(), SendError> {
        (**self).send_message(user, text).await
    }
}

// ============================================================================
// Production Adapters
// ============================================================================

/// Adapter to use Database as `FavoriteStore`
///
/// SQLite calls block, so each one runs on the blocking pool.
#[derive(Clone)]
pub struct DatabaseStore {
    db: Database,
}

impl DatabaseStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    async fn blocking<T, F>(&self, op: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Database) -> Result<T, DbError> + Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || op(&db))
            .await
            .map_err(|e| StoreError::Unavailable(format!("Storage task failed: {e}")))?
            .map_err(StoreError::from)
    }
}

#[async_trait]
impl FavoriteStore for DatabaseStore {
    async fn get(&self, user: UserId) -> Result<Option<String>, StoreError> {
        self.blocking(move |db| db.get_favorite(user)).await
    }

    async fn upsert(&self, user: UserId, city: &str) -> Result<(), StoreError> {
        let city = city.to_string();
        self.blocking(move |db| db.upsert_favorite(user, &city)).await
    }

    async fn list_all(&self) -> Result<Vec<FavoriteRecord>, StoreError> {
        self.blocking(Database::list_favorites).await
    }
}
