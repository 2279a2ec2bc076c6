//! Database module
//!
//! Durable favorite-city storage on SQLite.

mod schema;

pub use schema::*;

use crate::state_machine::UserId;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Database connection lock poisoned")]
    LockPoisoned,
    #[error("Invalid city for user {0}: city must not be empty")]
    InvalidCity(UserId),
    #[error("Failed to read legacy favorites: {0}")]
    LegacyIo(#[from] std::io::Error),
    #[error("Malformed legacy favorites: {0}")]
    LegacyFormat(#[from] serde_json::Error),
}

pub type DbResult<T> = Result<T, DbError>;

/// Thread-safe database handle
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// Open an in-memory database (for testing)
    #[allow(dead_code)] // Used in tests
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    fn run_migrations(&self) -> DbResult<()> {
        let conn = self.lock()?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    fn lock(&self) -> DbResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| DbError::LockPoisoned)
    }

    // ==================== Favorite Operations ====================

    /// Get a user's favorite city
    pub fn get_favorite(&self, user_id: UserId) -> DbResult<Option<String>> {
        let conn = self.lock()?;
        let city = conn
            .query_row(
                "SELECT city FROM favorites WHERE user_id = ?1",
                params![user_id.0],
                |row| row.get(0),
            )
            .optional()?;
        Ok(city)
    }

    /// Insert or replace a user's favorite city
    pub fn upsert_favorite(&self, user_id: UserId, city: &str) -> DbResult<()> {
        let city = city.trim();
        if city.is_empty() {
            return Err(DbError::InvalidCity(user_id));
        }

        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO favorites (user_id, city, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(user_id) DO UPDATE SET city = excluded.city, updated_at = excluded.updated_at",
            params![user_id.0, city, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    /// Insert a favorite only if the user has none yet.
    /// Returns whether a row was written.
    pub fn insert_favorite_if_absent(&self, user_id: UserId, city: &str) -> DbResult<bool> {
        let city = city.trim();
        if city.is_empty() {
            return Err(DbError::InvalidCity(user_id));
        }

        let conn = self.lock()?;
        let inserted = conn.execute(
            "INSERT INTO favorites (user_id, city, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(user_id) DO NOTHING",
            params![user_id.0, city, Utc::now().to_rfc3339()],
        )?;
        Ok(inserted > 0)
    }

    /// All favorites, ordered by user id.
    ///
    /// The rows are read under a single lock, so the result is a consistent
    /// snapshot even while other tasks upsert.
    pub fn list_favorites(&self) -> DbResult<Vec<FavoriteRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT user_id, city FROM favorites ORDER BY user_id")?;
        let rows = stmt.query_map([], |row| {
            Ok(FavoriteRecord::new(UserId(row.get(0)?), row.get::<_, String>(1)?))
        })?;
        let favorites = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(favorites)
    }

    // ==================== Legacy Import ====================

    /// Import a `{"<user id>": "<city>"}` JSON file written by the previous
    /// bot. Returns the number of favorites imported.
    ///
    /// Only users without a stored favorite are imported, so running the
    /// import again never overrides a city set later. A missing file imports
    /// nothing. Entries whose key is not an integer or whose city is blank are
    /// skipped.
    pub fn import_legacy_json<P: AsRef<Path>>(&self, path: P) -> DbResult<usize> {
        let path = path.as_ref();
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No legacy favorites file");
                return Ok(0);
            }
            Err(e) => return Err(e.into()),
        };
        let entries: BTreeMap<String, String> = serde_json::from_str(&raw)?;

        let mut imported = 0;
        for (key, city) in entries {
            let Ok(id) = key.trim().parse::<i64>() else {
                tracing::warn!(key = %key, "Skipping legacy favorite with non-numeric user id");
                continue;
            };
            match self.insert_favorite_if_absent(UserId(id), &city) {
                Ok(true) => imported += 1,
                Ok(false) => {
                    tracing::debug!(user_id = id, "Keeping existing favorite over legacy entry");
                }
                Err(DbError::InvalidCity(user_id)) => {
                    tracing::warn!(user_id = %user_id, "Skipping legacy favorite with empty city");
                }
                Err(e) => return Err(e),
            }
        }

        tracing::info!(path = %path.display(), imported, "Imported legacy favorites");
        Ok(imported)
    }
}
