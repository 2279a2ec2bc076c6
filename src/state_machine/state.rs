//! Dialog state types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Chat participant identity (the Telegram chat id)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Why the bot is waiting for a city name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    /// Reply with the current weather once, store untouched
    LookupOnce,
    /// Resolve the city and remember it for the daily digest
    SetFavorite,
}

impl Intent {
    /// Label of the reply-keyboard button that starts this dialogue
    pub fn trigger_label(self) -> &'static str {
        match self {
            Intent::LookupOnce => "Get weather",
            Intent::SetFavorite => "Set favorite city",
        }
    }

    /// Question sent to the user when the dialogue starts
    pub fn prompt(self) -> &'static str {
        match self {
            Intent::LookupOnce => "Enter a city name:",
            Intent::SetFavorite => "Enter a city name for daily notifications:",
        }
    }
}

/// Per-user dialog state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DialogState {
    /// Not in a dialogue
    #[default]
    Idle,
    /// The next message from the user is a city name
    AwaitingCity { intent: Intent },
}

impl DialogState {
    pub fn is_idle(&self) -> bool {
        matches!(self, DialogState::Idle)
    }

    /// The pending intent, if any
    pub fn intent(&self) -> Option<Intent> {
        match self {
            DialogState::Idle => None,
            DialogState::AwaitingCity { intent } => Some(*intent),
        }
    }
}
