//! Level-up computation implementations.
//!
//! `LocalLevelUp` applies the built-in formula and is always available.
//! `ResilientLevelUp` fronts an optional primary implementation (e.g. an
//! embedded native module) and falls back to the local formula when the
//! primary is missing or fails, so a broken module degrades the computation
//! rather than the whole operation. Every result is tagged with the
//! implementation that produced it.

use std::sync::Arc;

use playvault_domain::entities::{LevelUpResult, Profile};

use crate::infrastructure::ports::{ComputeError, Implementation, LevelUpCompute};

/// In-process level-up computation using the canonical formula.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalLevelUp;

impl LocalLevelUp {
    /// The local formula cannot fail.
    pub fn compute(&self, profile: &Profile, amount: u64) -> LevelUpResult {
        profile.with_exp_added(amount)
    }
}

impl LevelUpCompute for LocalLevelUp {
    fn add_exp(&self, profile: &Profile, amount: u64) -> Result<LevelUpResult, ComputeError> {
        Ok(self.compute(profile, amount))
    }

    fn implementation(&self) -> Implementation {
        Implementation::Fallback
    }
}

/// Primary-with-fallback computation. Infallible: when the primary errors,
/// the local formula answers instead and the tag says so.
pub struct ResilientLevelUp {
    primary: Option<Arc<dyn LevelUpCompute>>,
    fallback: LocalLevelUp,
}

impl ResilientLevelUp {
    pub fn new(primary: Option<Arc<dyn LevelUpCompute>>) -> Self {
        Self {
            primary,
            fallback: LocalLevelUp,
        }
    }

    pub fn compute(&self, profile: &Profile, amount: u64) -> (LevelUpResult, Implementation) {
        if let Some(primary) = &self.primary {
            match primary.add_exp(profile, amount) {
                Ok(result) => return (result, primary.implementation()),
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        amount,
                        "Level-up module failed, using local fallback"
                    );
                }
            }
        }
        (self.fallback.compute(profile, amount), Implementation::Fallback)
    }
}
