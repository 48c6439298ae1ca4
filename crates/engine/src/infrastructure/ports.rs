//! Port traits for infrastructure boundaries.
//!
//! These are the ONLY abstractions in the engine. Everything else is concrete
//! types. Ports exist for:
//! - The versioned user store (could swap Redis -> another KV backend)
//! - The level-up computation (could swap the in-process formula -> a native
//!   module), with a local fallback either way

use async_trait::async_trait;

use playvault_domain::entities::{LevelUpResult, Profile};

// =============================================================================
// Error Types
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Connection error: {0}")]
    Connection(String),
    #[error("Store backend error: {0}")]
    Backend(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ComputeError {
    #[error("Compute module unavailable: {0}")]
    Unavailable(String),
    #[error("Compute module returned invalid output: {0}")]
    InvalidOutput(String),
}

// =============================================================================
// Versioned store
// =============================================================================

/// What the store holds for one user id.
///
/// `payload` is `None` for a user that has never been written; in that case
/// `version` is 0. Version 0 is reserved for "absent" and real records start
/// at version 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionedRecord {
    pub payload: Option<String>,
    pub version: u64,
}

/// Result of a conditional write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The write was applied; the record now carries `new_version`.
    Committed { new_version: u64 },
    /// Someone else moved the version first; nothing was written.
    Conflict { observed_version: u64 },
}

/// A key-value store holding one versioned payload per user id.
///
/// `conditional_write` is the only mutation: it commits the payload and bumps
/// the version if and only if the stored version still equals
/// `expected_version`. All optimistic-concurrency retry logic lives in the
/// repository layer, not here.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VersionStore: Send + Sync {
    async fn fetch(&self, user_id: &str) -> Result<VersionedRecord, StoreError>;

    async fn fetch_version(&self, user_id: &str) -> Result<u64, StoreError>;

    async fn conditional_write(
        &self,
        user_id: &str,
        expected_version: u64,
        payload: &str,
    ) -> Result<WriteOutcome, StoreError>;
}

// =============================================================================
// Level-up computation
// =============================================================================

/// Which implementation produced a level-up result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Implementation {
    Native,
    Fallback,
}

impl std::fmt::Display for Implementation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Native => write!(f, "native"),
            Self::Fallback => write!(f, "fallback"),
        }
    }
}

/// Computes the effect of an experience delta on a profile.
///
/// Synchronous on purpose: implementations run in-process (the local formula
/// or an embedded native module), and repository update closures invoke them
/// on every optimistic-concurrency attempt against freshly read state.
#[cfg_attr(test, mockall::automock)]
pub trait LevelUpCompute: Send + Sync {
    fn add_exp(&self, profile: &Profile, amount: u64) -> Result<LevelUpResult, ComputeError>;

    fn implementation(&self) -> Implementation;
}
