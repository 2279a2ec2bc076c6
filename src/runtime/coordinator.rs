//! Dispatch coordinator
//!
//! Routes user events through the dialog state machine, performs the
//! resulting effects, and owns the per-user dialog table.

use super::digest::{next_fire_after, DigestReport, DigestScheduler};
use super::traits::{FavoriteStore, MessageSender, StoreError, WeatherResolver};
use crate::state_machine::{transition, DialogState, Effect, Event, Intent, UserId};
use crate::weather::{WeatherError, LOOKUP_FAILED_REPLY};
use chrono::{DateTime, Local, NaiveTime};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

const SAVE_FAILED_REPLY: &str = "Could not save your favorite city, please try again later";

/// How a completed dialogue ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogOutcome {
    /// Weather sent for a one-off lookup
    WeatherSent { city: String },
    /// Favorite stored and confirmed
    FavoriteSaved { city: String },
    CityNotFound { city: String },
    /// Empty input or provider failure
    LookupFailed,
    /// Weather resolved but the favorite could not be stored
    SaveFailed { city: String },
}

impl fmt::Display for DialogOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DialogOutcome::WeatherSent { city } => write!(f, "weather sent for {city}"),
            DialogOutcome::FavoriteSaved { city } => write!(f, "favorite saved: {city}"),
            DialogOutcome::CityNotFound { city } => write!(f, "city not found: {city}"),
            DialogOutcome::LookupFailed => write!(f, "lookup failed"),
            DialogOutcome::SaveFailed { city } => write!(f, "favorite not saved: {city}"),
        }
    }
}

/// What the coordinator did with an inbound event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// Not part of any dialogue; the transport may handle it
    Ignored,
    /// The user was asked for a city
    Prompted(Intent),
    Completed(DialogOutcome),
}

type DialogSlot = Arc<Mutex<DialogState>>;

/// Coordinates dialogs and the daily digest for all users
pub struct Coordinator<S, W, M> {
    store: Arc<S>,
    weather: Arc<W>,
    sender: Arc<M>,
    digest: Arc<DigestScheduler<S, W, M>>,
    dialogs: Mutex<HashMap<UserId, DialogSlot>>,
}

impl<S, W, M> Coordinator<S, W, M>
where
    S: FavoriteStore + 'static,
    W: WeatherResolver + 'static,
    M: MessageSender + 'static,
{
    pub fn new(store: S, weather: W, sender: M, digest_concurrency: usize) -> Self {
        let store = Arc::new(store);
        let weather = Arc::new(weather);
        let sender = Arc::new(sender);
        let digest = Arc::new(DigestScheduler::new(
            store.clone(),
            weather.clone(),
            sender.clone(),
            digest_concurrency,
        ));
        Self {
            store,
            weather,
            sender,
            digest,
            dialogs: Mutex::new(HashMap::new()),
        }
    }

    // ==================== Entry points ====================

    pub async fn on_request_lookup(&self, user: UserId) -> Dispatch {
        self.handle_event(user, Event::RequestLookup).await
    }

    pub async fn on_request_set_favorite(&self, user: UserId) -> Dispatch {
        self.handle_event(user, Event::RequestSetFavorite).await
    }

    pub async fn on_user_text(&self, user: UserId, text: &str) -> Dispatch {
        self.handle_event(user, Event::text(text)).await
    }

    pub async fn on_digest_tick(&self) -> Result<DigestReport, StoreError> {
        self.digest.run_digest().await
    }

    /// Fire `on_digest_tick` every day at local time `at` until `shutdown`
    /// is cancelled.
    ///
    /// Each run is spawned so a slow run never delays the timer. A run still
    /// in flight at shutdown is awaited, so its remaining recipients are
    /// served before this returns.
    pub async fn run_daily_digest(self: Arc<Self>, at: NaiveTime, shutdown: CancellationToken) {
        tracing::info!(at = %at, "Digest scheduler started");
        let mut last_fired: Option<DateTime<Local>> = None;
        let mut in_flight: Option<JoinHandle<()>> = None;

        loop {
            let now = Local::now();
            let next = next_fire_after(&now, last_fired.as_ref(), at);
            let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
            tracing::debug!(next_run = %next, wait_secs = wait.as_secs(), "Waiting for next digest");

            tokio::select! {
                () = shutdown.cancelled() => break,
                () = tokio::time::sleep(wait) => {}
            }

            last_fired = Some(next);
            let coordinator = Arc::clone(&self);
            in_flight = Some(tokio::spawn(async move {
                match coordinator.on_digest_tick().await {
                    Ok(report) => tracing::debug!(
                        run_id = %report.run_id,
                        skipped = report.skipped,
                        "Digest tick handled"
                    ),
                    Err(e) => tracing::debug!(error = %e, "Digest tick aborted"),
                }
            }));
        }

        if let Some(run) = in_flight.filter(|run| !run.is_finished()) {
            tracing::info!("Waiting for in-flight digest run before stopping");
            if let Err(e) = run.await {
                tracing::error!(error = %e, "Digest run did not complete");
            }
        }
        tracing::info!("Digest scheduler stopped");
    }

    /// The user's stored favorite city
    pub async fn favorite_of(&self, user: UserId) -> Result<Option<String>, StoreError> {
        self.store.get(user).await
    }

    /// Current dialog state; users never seen are `Idle`
    #[cfg(test)]
    pub async fn dialog_state(&self, user: UserId) -> DialogState {
        let slot = self.dialogs.lock().await.get(&user).cloned();
        match slot {
            Some(slot) => *slot.lock().await,
            None => DialogState::Idle,
        }
    }

    /// Drop idle dialog entries that no event is currently using.
    /// Returns the number of entries removed.
    pub async fn prune_idle_dialogs(&self) -> usize {
        let mut dialogs = self.dialogs.lock().await;
        let before = dialogs.len();
        dialogs.retain(|_, slot| {
            // Held or referenced elsewhere means an event is in flight
            if Arc::strong_count(slot) > 1 {
                return true;
            }
            match slot.try_lock() {
                Ok(state) => !state.is_idle(),
                Err(_) => true,
            }
        });
        let removed = before - dialogs.len();
        if removed > 0 {
            tracing::debug!(removed, remaining = dialogs.len(), "Pruned idle dialogs");
        }
        removed
    }

    // ==================== Event handling ====================

    async fn dialog_slot(&self, user: UserId) -> DialogSlot {
        let mut dialogs = self.dialogs.lock().await;
        Arc::clone(dialogs.entry(user).or_default())
    }

    /// Apply one event for a user.
    ///
    /// The user's slot stays locked through the transition and all of its
    /// effects, so one user's events are handled strictly in arrival order
    /// while other users proceed independently.
    async fn handle_event(&self, user: UserId, event: Event) -> Dispatch {
        let slot = self.dialog_slot(user).await;
        let mut state = slot.lock().await;

        let result = transition(&state, event);
        tracing::debug!(
            user_id = %user,
            pending = ?state.intent(),
            to = ?result.new_state,
            effects = result.effects.len(),
            "Dialog transition"
        );

        if result.is_ignored() {
            return Dispatch::Ignored;
        }

        // Committed before any I/O; effect failures never reopen the dialogue
        *state = result.new_state;

        let mut dispatch = Dispatch::Ignored;
        for effect in result.effects {
            dispatch = self.execute_effect(user, effect).await;
        }
        if let Dispatch::Completed(outcome) = &dispatch {
            tracing::info!(user_id = %user, outcome = %outcome, "Dialogue completed");
        }
        dispatch
    }

    async fn execute_effect(&self, user: UserId, effect: Effect) -> Dispatch {
        match effect {
            Effect::Prompt { intent } => {
                self.reply(user, intent.prompt()).await;
                Dispatch::Prompted(intent)
            }
            Effect::ReplyWeather { city } => {
                Dispatch::Completed(self.reply_weather(user, city).await)
            }
            Effect::SaveFavorite { city } => {
                Dispatch::Completed(self.save_favorite(user, city).await)
            }
            Effect::RejectCity => {
                tracing::info!(user_id = %user, "Rejected empty city");
                self.reply(user, LOOKUP_FAILED_REPLY).await;
                Dispatch::Completed(DialogOutcome::LookupFailed)
            }
        }
    }

    async fn reply_weather(&self, user: UserId, city: String) -> DialogOutcome {
        match self.weather.resolve(&city).await {
            Ok(summary) => {
                self.reply(user, &summary.to_string()).await;
                DialogOutcome::WeatherSent { city }
            }
            Err(e) => self.reply_lookup_error(user, city, &e).await,
        }
    }

    async fn save_favorite(&self, user: UserId, city: String) -> DialogOutcome {
        let summary = match self.weather.resolve(&city).await {
            Ok(summary) => summary,
            Err(e) => return self.reply_lookup_error(user, city, &e).await,
        };

        if let Err(e) = self.store.upsert(user, &city).await {
            tracing::error!(user_id = %user, city = %city, error = %e, "Failed to save favorite");
            self.reply(user, SAVE_FAILED_REPLY).await;
            return DialogOutcome::SaveFailed { city };
        }

        tracing::info!(user_id = %user, city = %city, "Favorite city saved");
        self.reply(user, &format!("{city} is now your favorite city!\n\n{summary}"))
            .await;
        DialogOutcome::FavoriteSaved { city }
    }

    async fn reply_lookup_error(&self, user: UserId, city: String, error: &WeatherError) -> DialogOutcome {
        self.reply(user, error.user_message()).await;
        match error {
            WeatherError::CityNotFound(_) => DialogOutcome::CityNotFound { city },
            WeatherError::Provider(_) => DialogOutcome::LookupFailed,
        }
    }

    /// Send a reply; delivery failures are logged and otherwise ignored
    async fn reply(&self, user: UserId, text: &str) {
        if let Err(e) = self.sender.send_message(user, text).await {
            tracing::warn!(user_id = %user, error = %e, "Failed to send reply");
        }
    }
}
