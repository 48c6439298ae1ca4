//! Redis-backed version store.
//!
//! Key layout per user id, under a configurable namespace (default `user`):
//! - `<ns>:<id>:data`     - hash, field `data` holds the JSON payload
//! - `<ns>:<id>:version`  - integer string, 0/absent means "never written"
//! - `<ns>:<id>:metadata` - hash, field `lastModified` holds an RFC 3339 stamp
//!
//! Reads fetch the payload and version inside MULTI/EXEC so the pair is a
//! consistent snapshot; a version read after an interleaved write would let a
//! stale payload commit at the writer's version and erase it.
//!
//! Conditional writes use WATCH on the version key, re-read the version, and
//! run the mutation inside MULTI/EXEC. A nil EXEC reply means the watched key
//! moved between the re-read and the commit, which is reported as a conflict.
//!
//! Connections come from a bb8 pool. A pooled connection is checked out
//! exclusively for the whole WATCH..EXEC window, so no other command from
//! this process can interleave on it and clear the watch. Every exit from
//! that window - commit, conflict, or error - leaves the connection
//! unwatched before it goes back to the pool.

use bb8_redis::bb8::Pool;
use bb8_redis::redis::{self, aio::ConnectionLike, AsyncCommands};
use bb8_redis::RedisConnectionManager;

use async_trait::async_trait;

use crate::infrastructure::ports::{StoreError, VersionStore, VersionedRecord, WriteOutcome};

const DEFAULT_NAMESPACE: &str = "user";

pub struct RedisVersionStore {
    pool: Pool<RedisConnectionManager>,
    namespace: String,
}

impl RedisVersionStore {
    pub fn new(pool: Pool<RedisConnectionManager>, namespace: impl Into<String>) -> Self {
        let namespace = namespace.into();
        let namespace = if namespace.is_empty() {
            DEFAULT_NAMESPACE.to_string()
        } else {
            namespace
        };
        Self { pool, namespace }
    }

    fn data_key(&self, user_id: &str) -> String {
        format!("{}:{}:data", self.namespace, user_id)
    }

    fn version_key(&self, user_id: &str) -> String {
        format!("{}:{}:version", self.namespace, user_id)
    }

    fn metadata_key(&self, user_id: &str) -> String {
        format!("{}:{}:metadata", self.namespace, user_id)
    }
}

/// An absent or unparseable version key reads as version 0.
fn parse_version(raw: Option<String>) -> u64 {
    raw.and_then(|s| s.parse().ok()).unwrap_or(0)
}

/// Transactional payload+version read. MULTI/EXEC makes the pair a single
/// consistent snapshot.
fn fetch_pipe(data_key: &str, version_key: &str) -> redis::Pipeline {
    let mut pipe = redis::pipe();
    pipe.atomic().hget(data_key, "data").get(version_key);
    pipe
}

async fn fetch_on<C>(
    conn: &mut C,
    data_key: &str,
    version_key: &str,
) -> Result<VersionedRecord, StoreError>
where
    C: ConnectionLike + Send,
{
    let (payload, version): (Option<String>, Option<String>) =
        fetch_pipe(data_key, version_key).query_async(conn).await?;
    Ok(VersionedRecord {
        payload,
        version: parse_version(version),
    })
}

/// The WATCH..EXEC window. Callers must guarantee the connection ends up
/// unwatched on every path out of here; the conflict branch handles its own
/// UNWATCH, errors are handled by [`conditional_write_guarded`].
async fn conditional_write_on<C>(
    conn: &mut C,
    data_key: &str,
    version_key: &str,
    metadata_key: &str,
    expected_version: u64,
    payload: &str,
) -> Result<WriteOutcome, StoreError>
where
    C: ConnectionLike + Send + Sync,
{
    let _: () = redis::cmd("WATCH")
        .arg(version_key)
        .query_async(conn)
        .await?;

    let observed: Option<String> = conn.get(version_key).await?;
    let observed = parse_version(observed);
    if observed != expected_version {
        let _: () = redis::cmd("UNWATCH").query_async(conn).await?;
        return Ok(WriteOutcome::Conflict {
            observed_version: observed,
        });
    }

    let new_version = expected_version + 1;
    let last_modified = chrono::Utc::now().to_rfc3339();

    // Nil EXEC reply surfaces as None: the watched version key moved.
    let exec: Option<()> = redis::pipe()
        .atomic()
        .hset(data_key, "data", payload)
        .ignore()
        .set(version_key, new_version)
        .ignore()
        .hset(metadata_key, "lastModified", last_modified)
        .ignore()
        .query_async(conn)
        .await?;

    match exec {
        Some(()) => Ok(WriteOutcome::Committed { new_version }),
        None => {
            let observed: Option<String> = conn.get(version_key).await?;
            Ok(WriteOutcome::Conflict {
                observed_version: parse_version(observed),
            })
        }
    }
}

/// Runs the watched write and clears the watch before surfacing any error,
/// so a pooled connection is never returned still watching a key.
async fn conditional_write_guarded<C>(
    conn: &mut C,
    data_key: &str,
    version_key: &str,
    metadata_key: &str,
    expected_version: u64,
    payload: &str,
) -> Result<WriteOutcome, StoreError>
where
    C: ConnectionLike + Send + Sync,
{
    let result = conditional_write_on(
        conn,
        data_key,
        version_key,
        metadata_key,
        expected_version,
        payload,
    )
    .await;
    if result.is_err() {
        // Best effort: if even UNWATCH fails the connection is broken and
        // bb8 will discard it on its next validity check.
        let _: Result<(), redis::RedisError> =
            redis::cmd("UNWATCH").query_async(conn).await;
    }
    result
}

impl From<redis::RedisError> for StoreError {
    fn from(e: redis::RedisError) -> Self {
        StoreError::Backend(e.to_string())
    }
}

#[async_trait]
impl VersionStore for RedisVersionStore {
    async fn fetch(&self, user_id: &str) -> Result<VersionedRecord, StoreError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        fetch_on(
            &mut *conn,
            &self.data_key(user_id),
            &self.version_key(user_id),
        )
        .await
    }

    async fn fetch_version(&self, user_id: &str) -> Result<u64, StoreError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        let raw: Option<String> = conn.get(self.version_key(user_id)).await?;
        Ok(parse_version(raw))
    }

    async fn conditional_write(
        &self,
        user_id: &str,
        expected_version: u64,
        payload: &str,
    ) -> Result<WriteOutcome, StoreError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        conditional_write_guarded(
            &mut *conn,
            &self.data_key(user_id),
            &self.version_key(user_id),
            &self.metadata_key(user_id),
            expected_version,
            payload,
        )
        .await
    }
}
