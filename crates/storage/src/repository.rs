use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sensei_core::model::UserId;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;

use crate::cache::{InMemoryCache, LocalCache};

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Remote row holding a signed-in user's authoritative points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteProfile {
    pub user_id: UserId,
    pub points: u32,
    pub updated_at: DateTime<Utc>,
}

/// Remote persistence for per-user points.
///
/// Writes are last-write-wins; there is no conflict detection.
#[async_trait]
pub trait RemoteProgressRepository: Send + Sync {
    /// Fetch the profile row for `user`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the remote cannot be reached or the row is corrupt.
    async fn fetch_profile(&self, user: &UserId) -> Result<Option<RemoteProfile>, StorageError>;

    /// Create the row for `user` or overwrite its points.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the write fails.
    async fn upsert_points(
        &self,
        user: &UserId,
        points: u32,
        updated_at: DateTime<Utc>,
    ) -> Result<(), StorageError>;
}

/// In-memory remote for tests and offline prototyping.
///
/// Can be switched into a failing mode to exercise degraded paths.
#[derive(Clone, Default)]
pub struct InMemoryRemote {
    profiles: Arc<Mutex<HashMap<UserId, RemoteProfile>>>,
    failing: Arc<AtomicBool>,
    writes: Arc<AtomicUsize>,
}

impl InMemoryRemote {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of successful `upsert_points` calls so far.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Direct read that bypasses the failure switch, for assertions.
    #[must_use]
    pub fn points_of(&self, user: &UserId) -> Option<u32> {
        self.profiles
            .lock()
            .ok()
            .and_then(|guard| guard.get(user).map(|p| p.points))
    }

    fn check_available(&self) -> Result<(), StorageError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StorageError::Connection("remote unavailable".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteProgressRepository for InMemoryRemote {
    async fn fetch_profile(&self, user: &UserId) -> Result<Option<RemoteProfile>, StorageError> {
        self.check_available()?;
        let guard = self
            .profiles
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(user).cloned())
    }

    async fn upsert_points(
        &self,
        user: &UserId,
        points: u32,
        updated_at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        self.check_available()?;
        let mut guard = self
            .profiles
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(
            user.clone(),
            RemoteProfile {
                user_id: user.clone(),
                points,
                updated_at,
            },
        );
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Local cache plus optional remote, behind trait objects for easy backend swapping.
///
/// `remote` is resolved once at startup; `None` means every operation stays local.
#[derive(Clone)]
pub struct Storage {
    pub cache: Arc<dyn LocalCache>,
    pub remote: Option<Arc<dyn RemoteProgressRepository>>,
}

impl Storage {
    /// In-memory cache, no remote.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::local_only(Arc::new(InMemoryCache::new()))
    }

    #[must_use]
    pub fn local_only(cache: Arc<dyn LocalCache>) -> Self {
        Self {
            cache,
            remote: None,
        }
    }

    #[must_use]
    pub fn with_remote(mut self, remote: Arc<dyn RemoteProgressRepository>) -> Self {
        self.remote = Some(remote);
        self
    }

    #[must_use]
    pub fn has_remote(&self) -> bool {
        self.remote.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sensei_core::time::fixed_now;

    #[tokio::test]
    async fn in_memory_remote_round_trips_points() {
        let remote = InMemoryRemote::new();
        let user = UserId::new("u1");
        assert_eq!(remote.fetch_profile(&user).await.unwrap(), None);

        remote.upsert_points(&user, 40, fixed_now()).await.unwrap();
        remote.upsert_points(&user, 45, fixed_now()).await.unwrap();

        let profile = remote.fetch_profile(&user).await.unwrap().unwrap();
        assert_eq!(profile.points, 45);
        assert_eq!(profile.updated_at, fixed_now());
        assert_eq!(remote.write_count(), 2);
    }

    #[tokio::test]
    async fn failing_remote_errors_without_writing() {
        let remote = InMemoryRemote::new();
        let user = UserId::new("u1");
        remote.set_failing(true);

        assert!(matches!(
            remote.upsert_points(&user, 5, fixed_now()).await,
            Err(StorageError::Connection(_))
        ));
        assert!(remote.fetch_profile(&user).await.is_err());
        assert_eq!(remote.points_of(&user), None);
        assert_eq!(remote.write_count(), 0);
    }

    #[test]
    fn storage_builders() {
        let storage = Storage::in_memory();
        assert!(!storage.has_remote());
        let storage = storage.with_remote(Arc::new(InMemoryRemote::new()));
        assert!(storage.has_remote());
    }
}
