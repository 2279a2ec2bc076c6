//! Effects produced by dialog transitions

use super::state::Intent;

/// Effects to be executed after a transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Ask the user for a city name
    Prompt { intent: Intent },

    /// Resolve the weather and reply with it; the store is not touched
    ReplyWeather { city: String },

    /// Resolve the weather, upsert the favorite on success, then confirm
    SaveFavorite { city: String },

    /// The supplied text cannot be a city; reply with the lookup failure
    RejectCity,
}

impl Effect {
    /// Effect that completes a dialogue started with `intent`
    pub fn complete(intent: Intent, city: impl Into<String>) -> Self {
        match intent {
            Intent::LookupOnce => Effect::ReplyWeather { city: city.into() },
            Intent::SetFavorite => Effect::SaveFavorite { city: city.into() },
        }
    }
}
