use std::sync::Arc;
use tracing::instrument;

use super::locks::{KeyGuard, KeyLocks};
use super::record::ClientRecord;
use super::RecordBackend;
use crate::clock::{Clock, SystemClock};
use crate::error::AppError;
use crate::identity::SessionToken;
use crate::rank::{Rank, RollOutcome};

/// Owns every client record and the cooldown gate around updating them.
///
/// Updates for one token are serialized through `locks`; different tokens
/// never wait on each other.
pub struct ClientStateStore {
    backend: Arc<dyn RecordBackend>,
    locks: KeyLocks,
    cooldown_secs: f64,
    clock: Arc<dyn Clock>,
}

impl ClientStateStore {
    pub fn new(backend: Arc<dyn RecordBackend>, cooldown_secs: f64) -> Self {
        Self {
            backend,
            locks: KeyLocks::default(),
            cooldown_secs,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub async fn exists(&self, token: &SessionToken) -> Result<bool, AppError> {
        self.backend.exists(token.as_str()).await
    }

    /// Writes an empty record. Existing records are never overwritten.
    #[instrument(skip_all, fields(token = %token))]
    pub async fn create(&self, token: &SessionToken) -> Result<(), AppError> {
        let guard = self.locks.lock(token.as_str()).await;

        if self.backend.exists(token.as_str()).await? {
            tracing::warn!("Record already exists, leaving it untouched");
            return Ok(());
        }

        self.commit(guard, token, ClientRecord::default().encode()).await?;
        tracing::info!("Created client record");
        Ok(())
    }

    pub async fn get(&self, token: &SessionToken) -> Result<ClientRecord, AppError> {
        let raw = self
            .backend
            .get(token.as_str())
            .await?
            .ok_or_else(|| AppError::ClientNotFound(token.clone()))?;

        ClientRecord::decode(&raw).map_err(|source| AppError::CorruptRecord { token: token.clone(), source })
    }

    /// Commits `rank` unless the client is still cooling down.
    ///
    /// A record that fails to decode is reported as `CorruptRecord` and kept
    /// as-is. A missing record is treated as a fresh one.
    #[instrument(skip_all, fields(token = %token, rank = %rank))]
    pub async fn read_modify_write(&self, token: &SessionToken, rank: Rank) -> Result<RollOutcome, AppError> {
        let guard = self.locks.lock(token.as_str()).await;

        let mut record = match self.backend.get(token.as_str()).await? {
            Some(raw) => match ClientRecord::decode(&raw) {
                Ok(record) => record,
                Err(e) => {
                    tracing::warn!(error = %e, raw = %raw, "Client record is corrupt, rejecting draw");
                    return Ok(RollOutcome::CorruptRecord);
                }
            },
            None => {
                tracing::debug!("No stored record, starting from an empty one");
                ClientRecord::default()
            }
        };

        let now = self.clock.now();
        if record.cooldown_active(now, self.cooldown_secs) {
            tracing::debug!(last_draw_time = ?record.last_draw_time, now, "Cooldown active, draw discarded");
            return Ok(RollOutcome::CooldownRejected);
        }

        record.record_draw(rank, now);
        self.commit(guard, token, record.encode()).await?;

        tracing::debug!(total_draws = record.total_draws(), "Draw committed");
        Ok(RollOutcome::Accepted(rank))
    }

    /// Writes on a separate task that owns the key lock, so an abandoned
    /// request still finishes its write before the next update for the token.
    async fn commit(&self, guard: KeyGuard, token: &SessionToken, encoded: String) -> Result<(), AppError> {
        let backend = Arc::clone(&self.backend);
        let key = token.as_str().to_owned();

        tokio::spawn(async move {
            let _guard = guard;
            backend.put(&key, &encoded).await
        })
        .await?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::data::{FileBackend, MemoryBackend};
    use std::time::Duration;

    const COOLDOWN: f64 = 5.0;

    fn setup() -> (ClientStateStore, Arc<MemoryBackend>, Arc<ManualClock>) {
        let backend = Arc::new(MemoryBackend::default());
        let clock = Arc::new(ManualClock::new(1_700_000_000.0));
        let store = ClientStateStore::new(backend.clone(), COOLDOWN).with_clock(clock.clone());
        (store, backend, clock)
    }

    fn rank(value: i8) -> Rank {
        Rank::new(value).unwrap()
    }

    #[tokio::test]
    async fn test_create_writes_empty_record() {
        let (store, _, _) = setup();
        let token = SessionToken::mint(0.0);

        assert!(!store.exists(&token).await.unwrap());
        store.create(&token).await.unwrap();

        assert!(store.exists(&token).await.unwrap());
        let record = store.get(&token).await.unwrap();
        assert_eq!(record, ClientRecord::default());
    }

    #[tokio::test]
    async fn test_create_does_not_clobber() {
        let (store, _, _) = setup();
        let token = SessionToken::mint(0.0);
        store.create(&token).await.unwrap();
        store.read_modify_write(&token, rank(3)).await.unwrap();

        store.create(&token).await.unwrap();
        assert_eq!(store.get(&token).await.unwrap().total_draws(), 1);
    }

    #[tokio::test]
    async fn test_second_draw_inside_cooldown_is_rejected() {
        let (store, _, clock) = setup();
        let token = SessionToken::mint(0.0);
        store.create(&token).await.unwrap();

        let first = store.read_modify_write(&token, rank(12)).await.unwrap();
        assert_eq!(first, RollOutcome::Accepted(rank(12)));
        let after_first = store.get(&token).await.unwrap();
        assert_eq!(after_first.histogram[rank(12).index()], 1);
        assert_eq!(after_first.last_draw_time, Some(1_700_000_000.0));

        clock.advance(COOLDOWN - 0.5);
        let second = store.read_modify_write(&token, rank(16)).await.unwrap();
        assert_eq!(second, RollOutcome::CooldownRejected);
        assert_eq!(store.get(&token).await.unwrap(), after_first);
    }

    #[tokio::test]
    async fn test_draws_after_cooldown_are_both_accepted() {
        let (store, _, clock) = setup();
        let token = SessionToken::mint(0.0);
        store.create(&token).await.unwrap();

        assert!(store.read_modify_write(&token, rank(16)).await.unwrap().is_accepted());
        let first_time = store.get(&token).await.unwrap().last_draw_time.unwrap();

        clock.advance(COOLDOWN + 0.1);
        assert!(store.read_modify_write(&token, rank(15)).await.unwrap().is_accepted());

        let record = store.get(&token).await.unwrap();
        assert_eq!(record.total_draws(), 2);
        assert_eq!(record.histogram[rank(16).index()], 1);
        assert_eq!(record.histogram[rank(15).index()], 1);
        assert!(record.last_draw_time.unwrap() > first_time);
    }

    #[tokio::test]
    async fn test_rapid_draws_all_rejected() {
        let (store, _, clock) = setup();
        let token = SessionToken::mint(0.0);
        store.create(&token).await.unwrap();
        store.read_modify_write(&token, rank(14)).await.unwrap();

        for _ in 0..20 {
            clock.advance(0.2);
            let outcome = store.read_modify_write(&token, rank(0)).await.unwrap();
            assert_eq!(outcome, RollOutcome::CooldownRejected);
        }
        assert_eq!(store.get(&token).await.unwrap().total_draws(), 1);
    }

    #[tokio::test]
    async fn test_corrupt_record_is_rejected_and_kept() {
        let (store, backend, _) = setup();
        let token = SessionToken::mint(0.0);
        let garbage = "1,2,three\n";
        backend.put(token.as_str(), garbage).await.unwrap();

        let outcome = store.read_modify_write(&token, rank(16)).await.unwrap();
        assert_eq!(outcome, RollOutcome::CorruptRecord);
        assert_eq!(backend.get(token.as_str()).await.unwrap().as_deref(), Some(garbage));
        assert!(matches!(store.get(&token).await, Err(AppError::CorruptRecord { .. })));
    }

    #[tokio::test]
    async fn test_missing_record_reports_not_found() {
        let (store, _, _) = setup();
        let token = SessionToken::mint(0.0);
        assert!(matches!(store.get(&token).await, Err(AppError::ClientNotFound(_))));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_draws_commit_exactly_once() {
        let (store, _, _) = setup();
        let store = Arc::new(store);
        let token = SessionToken::mint(0.0);
        store.create(&token).await.unwrap();

        let tasks = (0..64).map(|_| {
            let (store, token) = (store.clone(), token.clone());
            tokio::spawn(async move { store.read_modify_write(&token, rank(16)).await.unwrap() })
        });
        let outcomes = futures::future::join_all(tasks).await;

        let accepted = outcomes.into_iter().filter(|o| o.as_ref().unwrap().is_accepted()).count();
        assert_eq!(accepted, 1);
        assert_eq!(store.get(&token).await.unwrap().total_draws(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_abandoned_draws_leave_a_whole_record() {
        let dir = tempfile::tempdir().unwrap();
        let clock = Arc::new(ManualClock::new(1_700_000_000.0));
        let store = ClientStateStore::new(Arc::new(FileBackend::new(dir.path()).unwrap()), COOLDOWN)
            .with_clock(clock.clone());
        let token = SessionToken::mint(0.0);
        store.create(&token).await.unwrap();

        for i in 0..100u64 {
            clock.advance(COOLDOWN);
            let _ = tokio::time::timeout(Duration::from_micros(i * 20), store.read_modify_write(&token, rank(16))).await;
        }

        // Waits behind any write still holding the key lock.
        clock.advance(COOLDOWN);
        assert!(store.read_modify_write(&token, rank(0)).await.unwrap().is_accepted());

        let record = store.get(&token).await.unwrap();
        assert_eq!(record.histogram[rank(0).index()], 1);
        assert_eq!(record.last_draw_time, Some(clock.now()));

        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|name| name.ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty(), "temp files left: {:?}", leftovers);
    }
}
