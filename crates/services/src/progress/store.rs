use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use sensei_core::model::{Flashcard, Identity, ProgressState, TopicId, apply_points_delta};
use sensei_core::{Belt, Clock, ScoreRecord, TopicHistory};
use storage::cache::{LocalCache, keys};
use storage::repository::{StorageError, Storage};
use tokio::runtime::Handle;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::bus::{ProgressBus, ProgressEvent};
use crate::progress::codec;
use crate::progress::sync::{RemotePusher, SyncOutcome};

/// Mastery fractions shown while demo mode is on.
pub const DEMO_MASTERY_SNAPSHOT: [(&str, f64); 3] = [
    ("variables_types", 0.67),
    ("arrays_objects", 0.33),
    ("loops_conditionals", 0.0),
];

/// Single owner of the learner's points and quiz histories.
///
/// Every mutation lands in the local cache and is announced on the bus
/// before the call returns. Remote writes for signed-in users run as
/// spawned tasks; [`ProgressStore::settle`] waits for them.
pub struct ProgressStore {
    cache: Arc<dyn LocalCache>,
    pusher: Option<RemotePusher>,
    bus: ProgressBus,
    clock: Clock,
    identity: Mutex<Identity>,
    pending: Mutex<JoinSet<()>>,
    local: Mutex<()>,
}

impl ProgressStore {
    #[must_use]
    pub fn new(storage: Storage, bus: ProgressBus, clock: Clock) -> Self {
        let pusher = storage
            .remote
            .map(|remote| RemotePusher::new(remote, clock));
        Self {
            cache: storage.cache,
            pusher,
            bus,
            clock,
            identity: Mutex::new(Identity::Anonymous),
            pending: Mutex::new(JoinSet::new()),
            local: Mutex::new(()),
        }
    }

    /// Start with `identity` already established, without syncing.
    #[must_use]
    pub fn with_identity(self, identity: Identity) -> Self {
        *lock(&self.identity) = identity;
        self
    }

    #[must_use]
    pub fn bus(&self) -> &ProgressBus {
        &self.bus
    }

    #[must_use]
    pub fn identity(&self) -> Identity {
        lock(&self.identity).clone()
    }

    /// Whether a remote collaborator was configured at startup.
    #[must_use]
    pub fn is_remote_available(&self) -> bool {
        self.pusher.is_some()
    }

    //
    // ─── POINTS ────────────────────────────────────────────────────────────────
    //

    /// Current total from the local cache; absent or corrupt reads as 0.
    #[must_use]
    pub fn points(&self) -> u32 {
        codec::parse_points(self.read(keys::POINTS).as_deref())
    }

    #[must_use]
    pub fn belt(&self) -> Belt {
        Belt::for_points(self.points())
    }

    /// Adjust the total by `delta`, clamped to `0..=u32::MAX`, and return it.
    ///
    /// Subscribers see `PointsChanged` before this returns. For a signed-in
    /// user the new total is also pushed to the remote in the background;
    /// a failed push is logged and never rolls the local value back.
    pub fn add_points(&self, delta: i64) -> u32 {
        let next = {
            let _local = lock(&self.local);
            let next = apply_points_delta(self.points(), delta);
            self.write(keys::POINTS, &codec::encode_points(next));
            next
        };
        debug!(delta, points = next, "points updated");
        self.bus.publish(&ProgressEvent::PointsChanged { points: next });
        self.schedule_push(next);
        next
    }

    fn schedule_push(&self, points: u32) {
        let Some(pusher) = &self.pusher else {
            return;
        };
        let Some(user) = self.identity().user_id().cloned() else {
            return;
        };
        let Ok(handle) = Handle::try_current() else {
            debug!(points, "no async runtime, skipping remote push");
            return;
        };

        let seq = pusher.stamp();
        let task = pusher.clone().push(seq, user, points);
        let mut pending = lock(&self.pending);
        while pending.try_join_next().is_some() {}
        pending.spawn_on(task, &handle);
    }

    /// Wait for every remote push scheduled so far.
    pub async fn settle(&self) {
        let mut pending = std::mem::take(&mut *lock(&self.pending));
        while let Some(joined) = pending.join_next().await {
            if let Err(err) = joined {
                warn!(error = %err, "remote push task aborted");
            }
        }
    }

    /// Replace local points with the remote total for the signed-in user.
    ///
    /// A missing remote row is created with 0 points. Pending pushes are
    /// flushed first so the fetch observes them.
    pub async fn sync_from_remote(&self) -> SyncOutcome {
        self.settle().await;

        let Some(pusher) = &self.pusher else {
            return SyncOutcome::Unavailable;
        };
        let Some(user) = self.identity().user_id().cloned() else {
            return SyncOutcome::Unavailable;
        };
        let remote = pusher.remote();

        let points = match remote.fetch_profile(&user).await {
            Ok(Some(profile)) => profile.points,
            Ok(None) => {
                if let Err(err) = remote.upsert_points(&user, 0, self.clock.now()).await {
                    warn!(user = %user, error = %err, "could not create remote profile");
                    return SyncOutcome::Unavailable;
                }
                info!(user = %user, "created remote profile");
                0
            }
            Err(err) => {
                warn!(user = %user, error = %err, "remote fetch failed, staying local");
                return SyncOutcome::Unavailable;
            }
        };

        self.write(keys::POINTS, &codec::encode_points(points));
        info!(user = %user, points, "synced points from remote");
        self.bus.publish(&ProgressEvent::PointsChanged { points });
        SyncOutcome::Synced(points)
    }

    /// Switch the active identity.
    ///
    /// Signing in pulls the remote total (falling back to the local one when
    /// the remote is unavailable); signing out resets local progress.
    pub async fn set_identity(&self, identity: Identity) -> u32 {
        let signed_in = identity.is_signed_in();
        *lock(&self.identity) = identity;

        if signed_in {
            self.sync_from_remote()
                .await
                .points()
                .unwrap_or_else(|| self.points())
        } else {
            self.reset();
            0
        }
    }

    //
    // ─── HISTORIES ─────────────────────────────────────────────────────────────
    //

    /// Append `score` to the topic's history and return the updated history.
    pub fn record_quiz_attempt(&self, topic: &TopicId, score: ScoreRecord) -> TopicHistory {
        let _local = lock(&self.local);
        let mut histories = codec::parse_histories(self.read(keys::MASTERY).as_deref());
        let history = histories.entry(topic.clone()).or_default();
        history.push(score);
        let updated = history.clone();

        match codec::encode_histories(&histories) {
            Ok(raw) => self.write(keys::MASTERY, &raw),
            Err(err) => warn!(topic = %topic, error = %err, "could not encode histories"),
        }
        debug!(topic = %topic, score = score.value(), attempts = updated.len(), "quiz attempt recorded");
        updated
    }

    #[must_use]
    pub fn history(&self, topic: &TopicId) -> TopicHistory {
        self.histories().remove(topic).unwrap_or_default()
    }

    #[must_use]
    pub fn histories(&self) -> BTreeMap<TopicId, TopicHistory> {
        codec::parse_histories(self.read(keys::MASTERY).as_deref())
    }

    #[must_use]
    pub fn snapshot(&self) -> ProgressState {
        ProgressState {
            points: self.points(),
            histories: self.histories(),
        }
    }

    /// Clear points, histories and demo state from the local cache.
    ///
    /// The remote is left untouched. Custom flashcards survive.
    pub fn reset(&self) {
        let was_demo = self.is_demo_mode();
        {
            let _local = lock(&self.local);
            for key in [keys::POINTS, keys::MASTERY, keys::DEMO, keys::DEMO_MASTERY] {
                self.delete(key);
            }
        }
        info!("local progress reset");
        self.bus.publish(&ProgressEvent::PointsChanged { points: 0 });
        if was_demo {
            self.bus
                .publish(&ProgressEvent::DemoModeChanged { enabled: false });
        }
    }

    //
    // ─── DEMO MODE ─────────────────────────────────────────────────────────────
    //

    #[must_use]
    pub fn is_demo_mode(&self) -> bool {
        self.read(keys::DEMO).as_deref() == Some("true")
    }

    /// Displayed mastery overrides; empty unless demo mode is on.
    #[must_use]
    pub fn demo_mastery(&self) -> BTreeMap<TopicId, f64> {
        if !self.is_demo_mode() {
            return BTreeMap::new();
        }
        codec::parse_fractions(self.read(keys::DEMO_MASTERY).as_deref())
    }

    pub fn set_demo_mode(&self, enabled: bool) {
        if enabled {
            let snapshot: Vec<(TopicId, f64)> = DEMO_MASTERY_SNAPSHOT
                .iter()
                .map(|(topic, fraction)| (TopicId::new(*topic), *fraction))
                .collect();
            self.write(keys::DEMO, "true");
            match codec::encode_fractions(&snapshot) {
                Ok(raw) => self.write(keys::DEMO_MASTERY, &raw),
                Err(err) => warn!(error = %err, "could not encode demo mastery"),
            }
        } else {
            self.delete(keys::DEMO);
            self.delete(keys::DEMO_MASTERY);
        }
        info!(enabled, "demo mode changed");
        self.bus.publish(&ProgressEvent::DemoModeChanged { enabled });
    }

    //
    // ─── FLASHCARDS ────────────────────────────────────────────────────────────
    //

    #[must_use]
    pub fn custom_cards(&self, topic: &TopicId) -> Vec<Flashcard> {
        codec::parse_cards(self.read(&keys::custom_cards(topic)).as_deref())
    }

    /// Append a learner-authored card to the topic's deck.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the deck cannot be encoded or persisted.
    pub fn add_custom_card(&self, topic: &TopicId, card: Flashcard) -> Result<(), StorageError> {
        let _local = lock(&self.local);
        let key = keys::custom_cards(topic);
        let mut cards = codec::parse_cards(self.read(&key).as_deref());
        cards.push(card);
        let raw = codec::encode_cards(&cards)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        self.cache.set(&key, &raw)
    }

    pub fn save_flashcard_position(&self, topic: &TopicId, index: usize) {
        self.write(&keys::flashcard_index(topic), &index.to_string());
    }

    /// Last viewed index for the topic, or 0 when unset or no longer in range.
    #[must_use]
    pub fn flashcard_position(&self, topic: &TopicId, deck_len: usize) -> usize {
        codec::parse_index(self.read(&keys::flashcard_index(topic)).as_deref(), deck_len)
    }

    //
    // ─── CACHE ACCESS ──────────────────────────────────────────────────────────
    //

    fn read(&self, key: &str) -> Option<String> {
        self.cache.get(key).unwrap_or_else(|err| {
            warn!(key, error = %err, "local cache read failed");
            None
        })
    }

    fn write(&self, key: &str, value: &str) {
        if let Err(err) = self.cache.set(key, value) {
            warn!(key, error = %err, "local cache write failed");
        }
    }

    fn delete(&self, key: &str) {
        if let Err(err) = self.cache.remove(key) {
            warn!(key, error = %err, "local cache remove failed");
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
