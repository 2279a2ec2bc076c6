//! Inbound user events

use super::state::Intent;

/// Events that trigger dialog transitions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// User pressed the "get weather" trigger
    RequestLookup,
    /// User pressed the "set favorite city" trigger
    RequestSetFavorite,
    /// Any other message; non-text messages arrive with empty text
    Text { text: String },
}

impl Event {
    pub fn text(text: impl Into<String>) -> Self {
        Event::Text { text: text.into() }
    }

    /// The message text as the user sent it.
    ///
    /// Trigger events carry the label of the button that produced them, so a
    /// trigger pressed mid-dialogue is read as a city name like any other text.
    pub fn raw_text(&self) -> &str {
        match self {
            Event::RequestLookup => Intent::LookupOnce.trigger_label(),
            Event::RequestSetFavorite => Intent::SetFavorite.trigger_label(),
            Event::Text { text } => text,
        }
    }
}
