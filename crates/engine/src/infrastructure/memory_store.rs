//! In-memory version store.
//!
//! Backs local development (`PLAYVAULT_STORE=memory`) and the repository test
//! suite. Semantics mirror the Redis store: version 0 means absent, and a
//! conditional write commits atomically per key or reports the version it
//! observed instead.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::infrastructure::ports::{StoreError, VersionStore, VersionedRecord, WriteOutcome};

#[derive(Debug, Clone)]
struct StoredRecord {
    payload: String,
    version: u64,
    last_modified: DateTime<Utc>,
}

#[derive(Default)]
pub struct InMemoryVersionStore {
    records: DashMap<String, StoredRecord>,
}

impl InMemoryVersionStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn last_modified(&self, user_id: &str) -> Option<DateTime<Utc>> {
        self.records.get(user_id).map(|r| r.last_modified)
    }
}

#[async_trait]
impl VersionStore for InMemoryVersionStore {
    async fn fetch(&self, user_id: &str) -> Result<VersionedRecord, StoreError> {
        Ok(match self.records.get(user_id) {
            Some(record) => VersionedRecord {
                payload: Some(record.payload.clone()),
                version: record.version,
            },
            None => VersionedRecord {
                payload: None,
                version: 0,
            },
        })
    }

    async fn fetch_version(&self, user_id: &str) -> Result<u64, StoreError> {
        Ok(self.records.get(user_id).map_or(0, |r| r.version))
    }

    async fn conditional_write(
        &self,
        user_id: &str,
        expected_version: u64,
        payload: &str,
    ) -> Result<WriteOutcome, StoreError> {
        // The entry guard holds the shard lock for the whole check-and-set,
        // which gives the same per-key atomicity WATCH/MULTI/EXEC provides.
        match self.records.entry(user_id.to_string()) {
            Entry::Occupied(mut entry) => {
                let observed = entry.get().version;
                if observed != expected_version {
                    return Ok(WriteOutcome::Conflict {
                        observed_version: observed,
                    });
                }
                let new_version = observed + 1;
                *entry.get_mut() = StoredRecord {
                    payload: payload.to_string(),
                    version: new_version,
                    last_modified: Utc::now(),
                };
                Ok(WriteOutcome::Committed { new_version })
            }
            Entry::Vacant(entry) => {
                if expected_version != 0 {
                    return Ok(WriteOutcome::Conflict {
                        observed_version: 0,
                    });
                }
                entry.insert(StoredRecord {
                    payload: payload.to_string(),
                    version: 1,
                    last_modified: Utc::now(),
                });
                Ok(WriteOutcome::Committed { new_version: 1 })
            }
        }
    }
}
