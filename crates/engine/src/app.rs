//! Application state and composition.

use std::sync::Arc;

use crate::application::UserService;
use crate::infrastructure::levelup::ResilientLevelUp;
use crate::infrastructure::ports::VersionStore;
use crate::infrastructure::retry::RetryPolicy;
use crate::repositories::UserRepository;

/// Main application state, passed to handlers via axum state.
pub struct App {
    pub users: UserService,
}

impl App {
    /// Wire the service stack over the given store and level-up computation.
    pub fn new(
        store: Arc<dyn VersionStore>,
        levelup: Arc<ResilientLevelUp>,
        retry: RetryPolicy,
    ) -> Self {
        let repo = Arc::new(UserRepository::new(store, retry));
        Self {
            users: UserService::new(repo, levelup),
        }
    }
}
