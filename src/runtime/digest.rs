//! Daily weather digest
//!
//! Once a day every stored favorite is resolved and sent to its owner. A run
//! works from a snapshot of the store and never looks at dialog state.

use super::traits::{FavoriteStore, MessageSender, SendError, StoreError, WeatherResolver};
use crate::db::FavoriteRecord;
use crate::state_machine::UserId;
use crate::weather::WeatherError;
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone};
use futures::stream::{self, StreamExt};
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Why one recipient did not get the digest
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DigestFailureKind {
    Weather(WeatherError),
    Send(SendError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestFailure {
    pub user: UserId,
    pub city: String,
    pub kind: DigestFailureKind,
}

impl fmt::Display for DigestFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            DigestFailureKind::Weather(e) => {
                write!(f, "user {} ({}): lookup failed: {e}", self.user, self.city)
            }
            DigestFailureKind::Send(e) => {
                write!(f, "user {} ({}): delivery failed: {e}", self.user, self.city)
            }
        }
    }
}

/// Summary of one digest run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestReport {
    pub run_id: String,
    /// Another run was in flight, so this one did nothing
    pub skipped: bool,
    pub total: usize,
    pub delivered: usize,
    pub failures: Vec<DigestFailure>,
}

impl DigestReport {
    fn skipped(run_id: String) -> Self {
        Self {
            run_id,
            skipped: true,
            total: 0,
            delivered: 0,
            failures: vec![],
        }
    }
}

/// Text of the digest message for one recipient
pub fn digest_message(weather: &impl std::fmt::Display) -> String {
    format!("Today's weather:\n\n{weather}")
}

/// The next instant strictly after `now` whose local wall-clock time is `at`.
///
/// A time that falls into a DST gap moves forward to the first valid local
/// instant; an ambiguous time picks the earlier occurrence.
pub fn next_run_after<Tz: TimeZone>(now: &DateTime<Tz>, at: NaiveTime) -> DateTime<Tz> {
    let tz = now.timezone();
    let today = now.date_naive();
    let candidate = local_instant(&tz, today, at);
    if candidate > *now {
        return candidate;
    }
    let tomorrow = today.succ_opt().unwrap_or(today);
    local_instant(&tz, tomorrow, at)
}

/// The next digest instant for a timer that last fired at `last_fired`.
///
/// Never returns an instant at or before `last_fired`, so a wall clock
/// stepped backwards after a run cannot schedule the same run again.
pub fn next_fire_after<Tz: TimeZone>(
    now: &DateTime<Tz>,
    last_fired: Option<&DateTime<Tz>>,
    at: NaiveTime,
) -> DateTime<Tz> {
    match last_fired {
        Some(fired) if fired >= now => next_run_after(fired, at),
        _ => next_run_after(now, at),
    }
}

fn local_instant<Tz: TimeZone>(tz: &Tz, date: NaiveDate, at: NaiveTime) -> DateTime<Tz> {
    let naive = date.and_time(at);
    if let Some(instant) = tz.from_local_datetime(&naive).earliest() {
        return instant;
    }
    // Skipped by a DST gap: walk forward to the first wall-clock minute that exists
    let mut candidate = naive;
    for _ in 0..24 * 60 {
        candidate += chrono::Duration::minutes(1);
        if let Some(instant) = tz.from_local_datetime(&candidate).earliest() {
            return instant;
        }
    }
    tz.from_utc_datetime(&naive)
}

/// Runs the daily digest against the store, resolver and sender
pub struct DigestScheduler<S, W, M> {
    store: Arc<S>,
    weather: Arc<W>,
    sender: Arc<M>,
    concurrency: usize,
    /// Held for the duration of a run; at most one run is in flight
    in_flight: Mutex<()>,
}

impl<S, W, M> DigestScheduler<S, W, M>
where
    S: FavoriteStore + 'static,
    W: WeatherResolver + 'static,
    M: MessageSender + 'static,
{
    pub fn new(store: Arc<S>, weather: Arc<W>, sender: Arc<M>, concurrency: usize) -> Self {
        Self {
            store,
            weather,
            sender,
            concurrency: concurrency.max(1),
            in_flight: Mutex::new(()),
        }
    }

    /// Run one digest now.
    ///
    /// Returns a skipped report without touching the store if another run is
    /// still in flight. Only a failure to list the favorites aborts the run;
    /// per-recipient failures are collected in the report.
    pub async fn run_digest(&self) -> Result<DigestReport, StoreError> {
        let run_id = uuid::Uuid::new_v4().to_string();

        let Ok(_guard) = self.in_flight.try_lock() else {
            tracing::warn!(run_id = %run_id, "Digest already running, skipping tick");
            return Ok(DigestReport::skipped(run_id));
        };

        let records = match self.store.list_all().await {
            Ok(records) => records,
            Err(e) => {
                tracing::error!(run_id = %run_id, error = %e, "Digest aborted: cannot list favorites");
                return Err(e);
            }
        };

        let total = records.len();
        tracing::info!(run_id = %run_id, recipients = total, "Digest run started");

        let outcomes: Vec<Result<(), DigestFailure>> = stream::iter(records)
            .map(|record| deliver(Arc::clone(&self.weather), Arc::clone(&self.sender), record))
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let failures: Vec<DigestFailure> = outcomes.into_iter().filter_map(Result::err).collect();
        for failure in &failures {
            tracing::warn!(run_id = %run_id, failure = %failure, "Digest recipient skipped");
        }
        let report = DigestReport {
            run_id,
            skipped: false,
            total,
            delivered: total - failures.len(),
            failures,
        };

        tracing::info!(
            run_id = %report.run_id,
            total = report.total,
            delivered = report.delivered,
            failed = report.failures.len(),
            "Digest run finished"
        );
        Ok(report)
    }
}

async fn deliver<W, M>(weather: Arc<W>, sender: Arc<M>, record: FavoriteRecord) -> Result<(), DigestFailure>
where
    W: WeatherResolver,
    M: MessageSender,
{
    let FavoriteRecord { user_id, city } = record;

    let summary = match weather.resolve(&city).await {
        Ok(summary) => summary,
        Err(e) => {
            return Err(DigestFailure {
                user: user_id,
                city,
                kind: DigestFailureKind::Weather(e),
            });
        }
    };

    if let Err(e) = sender.send_message(user_id, &digest_message(&summary)).await {
        return Err(DigestFailure {
            user: user_id,
            city,
            kind: DigestFailureKind::Send(e),
        });
    }

    Ok(())
}
