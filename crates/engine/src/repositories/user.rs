//! User repository: optimistic concurrency over the version store.
//!
//! Every mutation is a read-modify-write against a versioned record. The
//! conditional write commits only if the version is unchanged since the read;
//! a conflict re-reads fresh state, re-applies the mutation, and tries again
//! with exponential backoff, up to the policy's attempt budget.
//!
//! Retry classification:
//! - Conflicts and store errors are transient and retried.
//! - Domain errors and "user not found" are deterministic; they abort the
//!   loop immediately because re-reading cannot change the outcome.

use std::sync::Arc;

use playvault_domain::{DomainError, UserAggregate};

use crate::infrastructure::ports::{StoreError, VersionStore, WriteOutcome};
use crate::infrastructure::retry::RetryPolicy;

#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("User not found: {0}")]
    NotFound(String),
    #[error("User already exists: {0}")]
    AlreadyExists(String),
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("Concurrent update lost after {attempts} attempts")]
    RetriesExhausted { attempts: u32 },
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Read result. `user` is `None` for an id that has never been written, in
/// which case `version` is 0. No placeholder record is synthesized.
#[derive(Debug, Clone)]
pub struct FindResult {
    pub user: Option<UserAggregate>,
    pub version: u64,
}

/// Result of a committed mutation: the closure's return value plus the state
/// and version that were actually written.
#[derive(Debug, Clone)]
pub struct Updated<T> {
    pub value: T,
    pub user: UserAggregate,
    pub version: u64,
}

pub struct UserRepository {
    store: Arc<dyn VersionStore>,
    retry: RetryPolicy,
}

impl UserRepository {
    pub fn new(store: Arc<dyn VersionStore>, retry: RetryPolicy) -> Self {
        Self { store, retry }
    }

    fn decode(payload: &str) -> Result<UserAggregate, RepoError> {
        serde_json::from_str(payload).map_err(|e| RepoError::Serialization(e.to_string()))
    }

    fn encode(user: &UserAggregate) -> Result<String, RepoError> {
        serde_json::to_string(user).map_err(|e| RepoError::Serialization(e.to_string()))
    }

    pub async fn find_one(&self, user_id: &str) -> Result<FindResult, RepoError> {
        let record = self.store.fetch(user_id).await?;
        let user = record.payload.as_deref().map(Self::decode).transpose()?;
        Ok(FindResult {
            user,
            version: record.version,
        })
    }

    /// Write `user` unconditionally in intent, conditionally in mechanism:
    /// each attempt re-reads the current version and commits against it.
    ///
    /// Returns the committed version. A returned version of 1 means this
    /// write created the record; anything higher replaced an existing one.
    pub async fn upsert_one(
        &self,
        user_id: &str,
        user: &UserAggregate,
    ) -> Result<u64, RepoError> {
        let payload = Self::encode(user)?;
        let mut last_store_err: Option<StoreError> = None;

        for attempt in 1..=self.retry.max_attempts {
            if attempt > 1 {
                tokio::time::sleep(self.retry.delay_before_retry(attempt - 1)).await;
            }

            let expected = match self.store.fetch_version(user_id).await {
                Ok(version) => version,
                Err(e) => {
                    tracing::warn!(user_id, attempt, error = %e, "Version read failed");
                    last_store_err = Some(e);
                    continue;
                }
            };

            match self
                .store
                .conditional_write(user_id, expected, &payload)
                .await
            {
                Ok(WriteOutcome::Committed { new_version }) => {
                    tracing::debug!(user_id, new_version, "Upsert committed");
                    return Ok(new_version);
                }
                Ok(WriteOutcome::Conflict { observed_version }) => {
                    tracing::warn!(
                        user_id,
                        attempt,
                        expected,
                        observed_version,
                        "Upsert lost a version race"
                    );
                    last_store_err = None;
                }
                Err(e) => {
                    tracing::warn!(user_id, attempt, error = %e, "Conditional write failed");
                    last_store_err = Some(e);
                }
            }
        }

        Err(self.exhausted(user_id, last_store_err))
    }

    /// Read-modify-write for an existing user.
    ///
    /// `mutate` runs on every attempt against freshly read state and returns
    /// a value carried out on commit. An absent user fails immediately with
    /// [`RepoError::NotFound`].
    pub async fn find_one_and_update<T, F>(
        &self,
        user_id: &str,
        mutate: F,
    ) -> Result<Updated<T>, RepoError>
    where
        F: Fn(&mut UserAggregate) -> Result<T, RepoError> + Send + Sync,
        T: Send,
    {
        let mut last_store_err: Option<StoreError> = None;

        for attempt in 1..=self.retry.max_attempts {
            if attempt > 1 {
                tokio::time::sleep(self.retry.delay_before_retry(attempt - 1)).await;
            }

            let record = match self.store.fetch(user_id).await {
                Ok(record) => record,
                Err(e) => {
                    tracing::warn!(user_id, attempt, error = %e, "Read failed");
                    last_store_err = Some(e);
                    continue;
                }
            };
            let Some(payload) = record.payload else {
                return Err(RepoError::NotFound(user_id.to_string()));
            };

            let mut user = Self::decode(&payload)?;
            let value = mutate(&mut user)?;
            let encoded = Self::encode(&user)?;

            match self
                .store
                .conditional_write(user_id, record.version, &encoded)
                .await
            {
                Ok(WriteOutcome::Committed { new_version }) => {
                    return Ok(Updated {
                        value,
                        user,
                        version: new_version,
                    });
                }
                Ok(WriteOutcome::Conflict { observed_version }) => {
                    tracing::warn!(
                        user_id,
                        attempt,
                        expected = record.version,
                        observed_version,
                        "Update lost a version race"
                    );
                    last_store_err = None;
                }
                Err(e) => {
                    tracing::warn!(user_id, attempt, error = %e, "Conditional write failed");
                    last_store_err = Some(e);
                }
            }
        }

        Err(self.exhausted(user_id, last_store_err))
    }

    /// Read-modify-write that tolerates absence: `build` receives the current
    /// state (or `None`) and returns the full state to persist.
    pub async fn find_one_and_upsert<F>(
        &self,
        user_id: &str,
        build: F,
    ) -> Result<Updated<()>, RepoError>
    where
        F: Fn(Option<UserAggregate>) -> Result<UserAggregate, RepoError> + Send + Sync,
    {
        let mut last_store_err: Option<StoreError> = None;

        for attempt in 1..=self.retry.max_attempts {
            if attempt > 1 {
                tokio::time::sleep(self.retry.delay_before_retry(attempt - 1)).await;
            }

            let record = match self.store.fetch(user_id).await {
                Ok(record) => record,
                Err(e) => {
                    tracing::warn!(user_id, attempt, error = %e, "Read failed");
                    last_store_err = Some(e);
                    continue;
                }
            };

            let current = record.payload.as_deref().map(Self::decode).transpose()?;
            let user = build(current)?;
            let encoded = Self::encode(&user)?;

            match self
                .store
                .conditional_write(user_id, record.version, &encoded)
                .await
            {
                Ok(WriteOutcome::Committed { new_version }) => {
                    return Ok(Updated {
                        value: (),
                        user,
                        version: new_version,
                    });
                }
                Ok(WriteOutcome::Conflict { observed_version }) => {
                    tracing::warn!(
                        user_id,
                        attempt,
                        expected = record.version,
                        observed_version,
                        "Upsert lost a version race"
                    );
                    last_store_err = None;
                }
                Err(e) => {
                    tracing::warn!(user_id, attempt, error = %e, "Conditional write failed");
                    last_store_err = Some(e);
                }
            }
        }

        Err(self.exhausted(user_id, last_store_err))
    }

    fn exhausted(&self, user_id: &str, last_store_err: Option<StoreError>) -> RepoError {
        let attempts = self.retry.max_attempts;
        tracing::error!(user_id, attempts, "Retry budget exhausted");
        match last_store_err {
            Some(e) => RepoError::Store(e),
            None => RepoError::RetriesExhausted { attempts },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::memory_store::InMemoryVersionStore;
    use crate::infrastructure::ports::{MockVersionStore, VersionedRecord};
    use chrono::Utc;
    use mockall::Sequence;
    use playvault_domain::Nickname;

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay_ms: 1,
            jitter_ceiling_ms: 0,
        }
    }

    fn aggregate(nickname: &str) -> UserAggregate {
        UserAggregate::new_user(Nickname::new(nickname).expect("valid"), Utc::now())
    }

    fn encoded(user: &UserAggregate) -> String {
        serde_json::to_string(user).expect("serialize")
    }

    #[tokio::test]
    async fn test_find_one_reports_absence_honestly() {
        let repo = UserRepository::new(Arc::new(InMemoryVersionStore::new()), fast_policy(3));
        let found = repo.find_one("ghost").await.expect("find");
        assert!(found.user.is_none());
        assert_eq!(found.version, 0);
    }

    #[tokio::test]
    async fn test_upsert_then_find_round_trips() {
        let repo = UserRepository::new(Arc::new(InMemoryVersionStore::new()), fast_policy(3));
        let user = aggregate("Alice");

        let version = repo.upsert_one("u1", &user).await.expect("upsert");
        assert_eq!(version, 1);

        let found = repo.find_one("u1").await.expect("find");
        assert_eq!(found.user, Some(user));
        assert_eq!(found.version, 1);
    }

    #[tokio::test]
    async fn test_repeated_upsert_bumps_version() {
        let repo = UserRepository::new(Arc::new(InMemoryVersionStore::new()), fast_policy(3));
        let user = aggregate("Alice");

        assert_eq!(repo.upsert_one("u1", &user).await.expect("upsert"), 1);
        assert_eq!(repo.upsert_one("u1", &user).await.expect("upsert"), 2);
        assert_eq!(repo.upsert_one("u1", &user).await.expect("upsert"), 3);
    }

    #[tokio::test]
    async fn test_update_of_absent_user_fails_without_retrying() {
        let mut store = MockVersionStore::new();
        // Exactly one read, no writes: absence is deterministic.
        store.expect_fetch().times(1).returning(|_| {
            Ok(VersionedRecord {
                payload: None,
                version: 0,
            })
        });
        store.expect_conditional_write().times(0);

        let repo = UserRepository::new(Arc::new(store), fast_policy(3));
        let err = repo
            .find_one_and_update("ghost", |_| Ok(()))
            .await
            .expect_err("absent");
        assert!(matches!(err, RepoError::NotFound(id) if id == "ghost"));
    }

    #[tokio::test]
    async fn test_update_applies_closure_and_commits() {
        let store = Arc::new(InMemoryVersionStore::new());
        let repo = UserRepository::new(store, fast_policy(3));
        repo.upsert_one("u1", &aggregate("Alice")).await.expect("seed");

        let updated = repo
            .find_one_and_update("u1", |user| {
                user.inventory.gold += 25;
                Ok(user.inventory.gold)
            })
            .await
            .expect("update");

        assert_eq!(updated.value, 1025);
        assert_eq!(updated.user.inventory.gold, 1025);
        assert_eq!(updated.version, 2);
    }

    #[tokio::test]
    async fn test_conflict_recomputes_against_fresh_state() {
        // First attempt reads version 1 and loses the race; the retry must
        // see the interleaved writer's state, not re-apply on top of stale.
        let stale = aggregate("Alice");
        let mut fresh = aggregate("Alice");
        fresh.inventory.gold = 5000;

        let stale_payload = encoded(&stale);
        let fresh_payload = encoded(&fresh);

        let mut store = MockVersionStore::new();
        let mut seq = Sequence::new();
        store
            .expect_fetch()
            .times(1)
            .in_sequence(&mut seq)
            .returning(move |_| {
                Ok(VersionedRecord {
                    payload: Some(stale_payload.clone()),
                    version: 1,
                })
            });
        store
            .expect_conditional_write()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _| {
                Ok(WriteOutcome::Conflict {
                    observed_version: 2,
                })
            });
        store
            .expect_fetch()
            .times(1)
            .in_sequence(&mut seq)
            .returning(move |_| {
                Ok(VersionedRecord {
                    payload: Some(fresh_payload.clone()),
                    version: 2,
                })
            });
        store
            .expect_conditional_write()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _| Ok(WriteOutcome::Committed { new_version: 3 }));

        let repo = UserRepository::new(Arc::new(store), fast_policy(3));
        let updated = repo
            .find_one_and_update("u1", |user| {
                user.inventory.gold += 100;
                Ok(user.inventory.gold)
            })
            .await
            .expect("update");

        // 5000 from the interleaved writer, plus our 100.
        assert_eq!(updated.value, 5100);
        assert_eq!(updated.version, 3);
    }

    #[tokio::test]
    async fn test_persistent_conflict_exhausts_retry_budget() {
        let payload = encoded(&aggregate("Alice"));

        let mut store = MockVersionStore::new();
        store.expect_fetch().times(3).returning(move |_| {
            Ok(VersionedRecord {
                payload: Some(payload.clone()),
                version: 1,
            })
        });
        store
            .expect_conditional_write()
            .times(3)
            .returning(|_, _, _| {
                Ok(WriteOutcome::Conflict {
                    observed_version: 9,
                })
            });

        let repo = UserRepository::new(Arc::new(store), fast_policy(3));
        let err = repo
            .find_one_and_update("u1", |_| Ok(()))
            .await
            .expect_err("exhausted");
        assert!(matches!(err, RepoError::RetriesExhausted { attempts: 3 }));
    }

    #[tokio::test]
    async fn test_store_errors_are_retried_and_surfaced_on_exhaustion() {
        let mut store = MockVersionStore::new();
        store.expect_fetch().times(3).returning(|_| {
            Err(StoreError::Connection("redis is down".into()))
        });
        store.expect_conditional_write().times(0);

        let repo = UserRepository::new(Arc::new(store), fast_policy(3));
        let err = repo
            .find_one_and_update("u1", |_| Ok(()))
            .await
            .expect_err("store down");
        assert!(matches!(err, RepoError::Store(StoreError::Connection(_))));
    }

    #[tokio::test]
    async fn test_domain_error_aborts_without_retry() {
        let payload = encoded(&aggregate("Alice"));

        let mut store = MockVersionStore::new();
        store.expect_fetch().times(1).returning(move |_| {
            Ok(VersionedRecord {
                payload: Some(payload.clone()),
                version: 1,
            })
        });
        store.expect_conditional_write().times(0);

        let repo = UserRepository::new(Arc::new(store), fast_policy(3));
        let err = repo
            .find_one_and_update("u1", |user| {
                user.inventory.spend_currency(u64::MAX, 0)?;
                Ok(())
            })
            .await
            .expect_err("domain");
        assert!(matches!(
            err,
            RepoError::Domain(DomainError::InsufficientFunds { .. })
        ));
    }

    #[tokio::test]
    async fn test_upsert_builder_sees_current_state() {
        let store = Arc::new(InMemoryVersionStore::new());
        let repo = UserRepository::new(store, fast_policy(3));

        let created = repo
            .find_one_and_upsert("u1", |existing| match existing {
                None => Ok(aggregate("Alice")),
                Some(_) => Err(RepoError::AlreadyExists("u1".into())),
            })
            .await
            .expect("create");
        assert_eq!(created.version, 1);

        let err = repo
            .find_one_and_upsert("u1", |existing| match existing {
                None => Ok(aggregate("Alice")),
                Some(_) => Err(RepoError::AlreadyExists("u1".into())),
            })
            .await
            .expect_err("duplicate");
        assert!(matches!(err, RepoError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn test_concurrent_updates_all_land() {
        // Every task adds gold through the full read-modify-write loop; the
        // final balance must reflect every addition exactly once.
        let store = Arc::new(InMemoryVersionStore::new());
        let repo = Arc::new(UserRepository::new(store, fast_policy(10)));
        repo.upsert_one("u1", &aggregate("Alice")).await.expect("seed");

        let tasks: u64 = 8;
        let mut handles = Vec::new();
        for _ in 0..tasks {
            let repo = repo.clone();
            handles.push(tokio::spawn(async move {
                repo.find_one_and_update("u1", |user| {
                    user.inventory.gold += 100;
                    Ok(())
                })
                .await
            }));
        }
        for handle in handles {
            handle.await.expect("join").expect("update");
        }

        let found = repo.find_one("u1").await.expect("find");
        let user = found.user.expect("present");
        assert_eq!(user.inventory.gold, 1000 + 100 * tasks);
        // Seed write plus one committed write per task.
        assert_eq!(found.version, 1 + tasks);
    }
}
