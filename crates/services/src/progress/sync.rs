use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use sensei_core::Clock;
use sensei_core::model::UserId;
use storage::repository::RemoteProgressRepository;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Result of pulling the authoritative points total from the remote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Remote answered; local cache now holds this total.
    Synced(u32),
    /// No remote, anonymous identity, or the remote failed.
    Unavailable,
}

impl SyncOutcome {
    #[must_use]
    pub fn points(self) -> Option<u32> {
        match self {
            SyncOutcome::Synced(points) => Some(points),
            SyncOutcome::Unavailable => None,
        }
    }
}

/// Serializes best-effort point pushes so the remote ends on the newest local total.
///
/// Each push is stamped with a sequence number when it is scheduled; a push
/// that acquires the lock after a newer one has already been written is
/// skipped.
#[derive(Clone)]
pub(crate) struct RemotePusher {
    remote: Arc<dyn RemoteProgressRepository>,
    clock: Clock,
    next_seq: Arc<AtomicU64>,
    written_seq: Arc<Mutex<u64>>,
}

impl RemotePusher {
    pub(crate) fn new(remote: Arc<dyn RemoteProgressRepository>, clock: Clock) -> Self {
        Self {
            remote,
            clock,
            next_seq: Arc::new(AtomicU64::new(1)),
            written_seq: Arc::new(Mutex::new(0)),
        }
    }

    pub(crate) fn remote(&self) -> &Arc<dyn RemoteProgressRepository> {
        &self.remote
    }

    /// Reserve the sequence number for a push scheduled now.
    pub(crate) fn stamp(&self) -> u64 {
        self.next_seq.fetch_add(1, Ordering::SeqCst)
    }

    pub(crate) async fn push(self, seq: u64, user: UserId, points: u32) {
        let mut written = self.written_seq.lock().await;
        if *written > seq {
            debug!(user = %user, points, seq, "skipping superseded remote push");
            return;
        }
        match self.remote.upsert_points(&user, points, self.clock.now()).await {
            Ok(()) => {
                *written = seq;
                debug!(user = %user, points, "remote points updated");
            }
            Err(err) => warn!(user = %user, points, error = %err, "remote points update failed"),
        }
    }
}
