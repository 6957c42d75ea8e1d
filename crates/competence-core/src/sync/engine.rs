//! Per-character replication state machine.
//!
//! `clean -> dirty -> syncing -> clean` on success, `syncing -> dirty` on
//! failure with a retry scheduled. Every recorded snapshot is written to the
//! local cache synchronously; the remote write happens later on its own
//! spawned task, so a caller dropping its `flush()` future never cancels a
//! write halfway. While dirty, the cache entry is flagged unsynced so a later
//! session can pick the edits up again.
//!
//! All remote writes for one character go through a single in-flight guard:
//! a flush requested while another is running joins it instead of starting a
//! second write.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use tokio::sync::broadcast;
use tokio::time::Instant;
use tracing::Instrument;

use competence_types::character::CharacterId;
use competence_types::config::SyncConfig;
use competence_types::error::{RepositoryError, SyncError};
use competence_types::profile::CompetenceProfile;
use competence_types::sync::{FlushOutcome, SyncEvent, SyncStatus};

use super::backoff::retry_delay;
use super::events::SyncEventBus;
use super::scheduler::{Scheduler, TaskHandle};
use crate::repository::cache::LocalCache;
use crate::repository::character::CharacterRepository;

const FAILURE_NOTICE: &str = "Changes could not be saved to the server; retrying in the background.";

type InFlight = Shared<BoxFuture<'static, FlushOutcome>>;

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Timer {
    Debounce,
    Retry,
}

struct TimerSlot {
    seq: u64,
    handle: TaskHandle,
}

struct SyncState {
    /// `profile_data` as loaded; every write merges the snapshot into it.
    /// `None` until it is known; the first write then fetches it.
    document: Option<serde_json::Value>,
    snapshot: Option<CompetenceProfile>,
    /// Bumped on every `record`; a write only clears `dirty` when no newer
    /// generation landed while it was in flight.
    generation: u64,
    dirty: bool,
    retry_count: u32,
    in_flight: Option<InFlight>,
    debounce: Option<TimerSlot>,
    retry: Option<TimerSlot>,
    timer_seq: u64,
    last_notice: Option<Instant>,
    closed: bool,
}

impl SyncState {
    fn slot(&mut self, timer: Timer) -> &mut Option<TimerSlot> {
        match timer {
            Timer::Debounce => &mut self.debounce,
            Timer::Retry => &mut self.retry,
        }
    }

    fn cancel(&mut self, timer: Timer) {
        if let Some(slot) = self.slot(timer).take() {
            slot.handle.cancel();
        }
    }
}

struct SyncInner<C, R, S> {
    character_id: CharacterId,
    cache: Arc<C>,
    remote: Option<Arc<R>>,
    scheduler: Arc<S>,
    config: SyncConfig,
    events: SyncEventBus,
    state: Mutex<SyncState>,
}

// ---------------------------------------------------------------------------
// PersistenceSync
// ---------------------------------------------------------------------------

/// Dirty-tracked, debounced replication of one character's competence
/// block.
///
/// Without a remote repository the engine runs local-only: snapshots go to
/// the cache and `flush` reports `FlushOutcome::LocalOnly`.
pub struct PersistenceSync<C, R, S> {
    inner: Arc<SyncInner<C, R, S>>,
}

impl<C, R, S> Clone for PersistenceSync<C, R, S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C, R, S> PersistenceSync<C, R, S>
where
    C: LocalCache,
    R: CharacterRepository,
    S: Scheduler,
{
    /// Create the engine for one character. `document` is the character's
    /// `profile_data` as loaded; its other keys are carried on every write.
    /// A null document means it could not be loaded, and the first write
    /// fetches it from the remote store before merging.
    pub fn new(
        character_id: CharacterId,
        cache: Arc<C>,
        remote: Option<Arc<R>>,
        scheduler: Arc<S>,
        config: SyncConfig,
        document: serde_json::Value,
    ) -> Self {
        Self {
            inner: Arc::new(SyncInner {
                character_id,
                cache,
                remote,
                scheduler,
                config,
                events: SyncEventBus::default(),
                state: Mutex::new(SyncState {
                    document: (!document.is_null()).then_some(document),
                    snapshot: None,
                    generation: 0,
                    dirty: false,
                    retry_count: 0,
                    in_flight: None,
                    debounce: None,
                    retry: None,
                    timer_seq: 0,
                    last_notice: None,
                    closed: false,
                }),
            }),
        }
    }

    pub fn character_id(&self) -> &CharacterId {
        &self.inner.character_id
    }

    /// Adopt a snapshot that the remote store already holds: the cache is
    /// written but nothing is marked dirty.
    pub fn prime(&self, profile: &CompetenceProfile) {
        let inner = &self.inner;
        let mut state = inner.lock();
        inner.store_cache(profile);
        inner.mark_unsynced(false);
        state.snapshot = Some(profile.clone());
    }

    /// Record a new snapshot: write the local cache now, mark dirty and
    /// (re)arm the debounced flush.
    ///
    /// While a retry is pending the debounce is not armed; the retry sends
    /// the latest snapshot anyway.
    pub fn record(&self, profile: &CompetenceProfile) {
        let inner = &self.inner;
        let mut state = inner.lock();
        if inner.remote.is_some() && !state.dirty {
            inner.mark_unsynced(true);
        }
        inner.store_cache(profile);

        state.generation += 1;
        state.snapshot = Some(profile.clone());
        if inner.remote.is_none() {
            return;
        }
        state.dirty = true;
        inner.events.publish(SyncEvent::Dirty);
        if state.retry.is_none() {
            let delay = Duration::from_millis(inner.config.debounce_ms);
            inner.arm(&mut state, Timer::Debounce, delay);
        }
    }

    /// Send the current snapshot if dirty.
    ///
    /// Joins the running write when one is in flight. Returns
    /// `FlushOutcome::Clean` without I/O when there is nothing to send.
    pub async fn flush(&self) -> FlushOutcome {
        match self.inner.begin_flush() {
            Ok(in_flight) => in_flight.await,
            Err(outcome) => outcome,
        }
    }

    /// Flush as soon as possible without waiting for the result (confirm,
    /// unload). Replaces a pending debounce.
    pub fn flush_now(&self) {
        let mut state = self.inner.lock();
        if state.dirty {
            self.inner.arm(&mut state, Timer::Debounce, Duration::ZERO);
        }
    }

    /// Connectivity came back: drop the backoff and retry immediately.
    pub async fn on_online(&self) -> FlushOutcome {
        {
            let mut state = self.inner.lock();
            if state.dirty {
                tracing::debug!(character_id = %self.inner.character_id, "online; retrying now");
                state.cancel(Timer::Retry);
            }
        }
        self.flush().await
    }

    /// Make one final flush attempt and stop all timers. Used on character
    /// switch; later `record` calls still reach the local cache.
    pub async fn close(&self) -> FlushOutcome {
        let outcome = self.flush().await;
        let mut state = self.inner.lock();
        state.closed = true;
        state.cancel(Timer::Debounce);
        state.cancel(Timer::Retry);
        outcome
    }

    pub fn status(&self) -> SyncStatus {
        let state = self.inner.lock();
        SyncStatus {
            dirty: state.dirty,
            syncing: state.in_flight.is_some(),
            retry_count: state.retry_count,
            local_only: self.inner.remote.is_none(),
        }
    }

    /// Observe replication events from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.inner.events.subscribe()
    }
}

// ---------------------------------------------------------------------------
// Internals
// ---------------------------------------------------------------------------

impl<C, R, S> SyncInner<C, R, S>
where
    C: LocalCache,
    R: CharacterRepository,
    S: Scheduler,
{
    fn lock(&self) -> MutexGuard<'_, SyncState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn store_cache(&self, profile: &CompetenceProfile) {
        if let Err(err) = self.cache.store(&self.character_id, profile) {
            tracing::warn!(character_id = %self.character_id, error = %err, "failed to write local cache");
        }
    }

    fn mark_unsynced(&self, unsynced: bool) {
        if let Err(err) = self.cache.set_unsynced(&self.character_id, unsynced) {
            tracing::warn!(character_id = %self.character_id, error = %err, "failed to update unsynced flag");
        }
    }

    /// Replace the timer for `timer` with one firing after `delay`.
    fn arm(self: &Arc<Self>, state: &mut SyncState, timer: Timer, delay: Duration) {
        state.cancel(timer);
        if state.closed {
            return;
        }
        state.timer_seq += 1;
        let seq = state.timer_seq;
        let weak = Arc::downgrade(self);
        let task = async move {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let started = {
                let mut state = inner.lock();
                let slot = state.slot(timer);
                if slot.as_ref().is_some_and(|s| s.seq == seq) {
                    *slot = None;
                }
                inner.begin_flush_locked(&mut state)
            };
            if let Ok(in_flight) = started {
                in_flight.await;
            }
        }
        .boxed();
        let handle = self.scheduler.schedule_once(delay, task);
        *state.slot(timer) = Some(TimerSlot { seq, handle });
    }

    fn begin_flush(self: &Arc<Self>) -> Result<InFlight, FlushOutcome> {
        let mut state = self.lock();
        self.begin_flush_locked(&mut state)
    }

    /// Join the in-flight write or spawn a new one for the current
    /// snapshot.
    fn begin_flush_locked(self: &Arc<Self>, state: &mut SyncState) -> Result<InFlight, FlushOutcome> {
        if let Some(in_flight) = &state.in_flight {
            return Ok(in_flight.clone());
        }
        let Some(remote) = self.remote.clone() else {
            return Err(FlushOutcome::LocalOnly);
        };
        if !state.dirty {
            return Err(FlushOutcome::Clean);
        }
        let Some(snapshot) = state.snapshot.clone() else {
            state.dirty = false;
            return Err(FlushOutcome::Clean);
        };
        let document = state.document.clone();

        state.cancel(Timer::Debounce);
        state.cancel(Timer::Retry);
        let generation = state.generation;
        let attempt = state.retry_count.saturating_add(1);

        let write = tokio::spawn(Arc::clone(self).write(remote, snapshot, document, generation, attempt));
        let weak = Arc::downgrade(self);
        let in_flight = async move {
            match write.await {
                Ok(outcome) => outcome,
                Err(err) => {
                    tracing::error!(attempt, error = %err, "flush task died");
                    match weak.upgrade() {
                        Some(inner) => inner.abandon(attempt),
                        None => FlushOutcome::Failed(SyncError::Aborted),
                    }
                }
            }
        }
        .boxed()
        .shared();
        state.in_flight = Some(in_flight.clone());
        Ok(in_flight)
    }

    async fn write(
        self: Arc<Self>,
        remote: Arc<R>,
        snapshot: CompetenceProfile,
        document: Option<serde_json::Value>,
        generation: u64,
        attempt: u32,
    ) -> FlushOutcome {
        self.events.publish(SyncEvent::FlushStarted { attempt });
        let span = tracing::info_span!("flush", character_id = %self.character_id, attempt);
        let result = async {
            let document = match document {
                Some(document) => document,
                None => self.load_document(remote.as_ref()).await?,
            };
            let body = snapshot
                .merge_into(&document)
                .map_err(|err| RepositoryError::Serialization(err.to_string()))?;
            remote.update_character(&self.character_id, body).await
        }
        .instrument(span)
        .await;
        self.complete(generation, attempt, result)
    }

    /// Fetch the `profile_data` the session could not load at bootstrap.
    async fn load_document(&self, remote: &R) -> Result<serde_json::Value, RepositoryError> {
        let document = remote
            .fetch_character(&self.character_id)
            .await?
            .map(|character| character.profile_data)
            .filter(|document| !document.is_null())
            .unwrap_or_else(|| serde_json::Value::Object(serde_json::Map::new()));
        tracing::debug!(character_id = %self.character_id, "profile document loaded before first write");
        self.lock().document = Some(document.clone());
        Ok(document)
    }

    fn complete(
        self: &Arc<Self>,
        generation: u64,
        attempt: u32,
        result: Result<(), RepositoryError>,
    ) -> FlushOutcome {
        let mut state = self.lock();
        state.in_flight = None;

        match result {
            Ok(()) => {
                state.retry_count = 0;
                state.cancel(Timer::Retry);
                if state.generation == generation {
                    state.dirty = false;
                    self.mark_unsynced(false);
                    tracing::info!(character_id = %self.character_id, attempt, "competences synced");
                    self.events.publish(SyncEvent::Synced);
                } else {
                    tracing::debug!(
                        character_id = %self.character_id,
                        "newer edits landed during flush; staying dirty"
                    );
                    let delay = Duration::from_millis(self.config.debounce_ms);
                    self.arm(&mut state, Timer::Debounce, delay);
                }
                FlushOutcome::Synced
            }
            Err(err) => self.fail(&mut state, attempt, SyncError::from(err)),
        }
    }

    /// The write task panicked or was aborted before `complete` ran.
    fn abandon(self: &Arc<Self>, attempt: u32) -> FlushOutcome {
        let mut state = self.lock();
        state.in_flight = None;
        self.fail(&mut state, attempt, SyncError::Aborted)
    }

    /// Record a failed attempt: stay dirty, back off and arm the retry.
    fn fail(self: &Arc<Self>, state: &mut SyncState, attempt: u32, error: SyncError) -> FlushOutcome {
        let delay = retry_delay(&self.config, state.retry_count);
        state.retry_count = state.retry_count.saturating_add(1);
        let retry_in_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        tracing::warn!(
            character_id = %self.character_id,
            attempt,
            retry_in_ms,
            error = %error,
            "flush failed; retry scheduled"
        );
        self.events.publish(SyncEvent::FlushFailed {
            attempt,
            retry_in_ms,
            message: error.to_string(),
        });
        self.notice(state);
        state.cancel(Timer::Debounce);
        self.arm(state, Timer::Retry, delay);
        FlushOutcome::Failed(error)
    }

    /// Publish the user-facing failure notice, at most once per throttle
    /// window.
    fn notice(&self, state: &mut SyncState) {
        let now = Instant::now();
        let window = Duration::from_millis(self.config.notice_throttle_ms);
        if state
            .last_notice
            .is_some_and(|last| now.duration_since(last) < window)
        {
            return;
        }
        state.last_notice = Some(now);
        self.events.publish(SyncEvent::Notice {
            message: FAILURE_NOTICE.to_string(),
        });
    }
}
