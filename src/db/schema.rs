//! Database schema and types

use crate::state_machine::UserId;
use serde::{Deserialize, Serialize};

/// SQL schema for initialization
pub const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS favorites (
    user_id INTEGER PRIMARY KEY,
    city TEXT NOT NULL CHECK (length(trim(city)) > 0),
    updated_at TEXT NOT NULL
);
";

/// A user's favorite city
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FavoriteRecord {
    pub user_id: UserId,
    pub city: String,
}

impl FavoriteRecord {
    pub fn new(user_id: UserId, city: impl Into<String>) -> Self {
        Self {
            user_id,
            city: city.into(),
        }
    }
}
