//! User service: request validation and orchestration over the repository.
//!
//! Each mutation runs as a repository update closure so its business logic is
//! re-applied against fresh state on every optimistic-concurrency attempt.

use std::sync::Arc;

use serde::Serialize;

use playvault_domain::entities::{Inventory, Item, Profile};
use playvault_domain::{DomainError, Nickname, UserAggregate};

use crate::infrastructure::levelup::ResilientLevelUp;
use crate::infrastructure::ports::Implementation;
use crate::repositories::{RepoError, UserRepository};

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Invalid request: {0}")]
    Validation(String),
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("User not found: {0}")]
    NotFound(String),
    #[error("User already exists: {0}")]
    AlreadyExists(String),
    #[error("Concurrent update conflict after {attempts} attempts, try again")]
    Conflict { attempts: u32 },
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<RepoError> for ServiceError {
    fn from(e: RepoError) -> Self {
        match e {
            RepoError::NotFound(id) => Self::NotFound(id),
            RepoError::AlreadyExists(id) => Self::AlreadyExists(id),
            RepoError::Domain(e) => Self::Domain(e),
            RepoError::RetriesExhausted { attempts } => Self::Conflict { attempts },
            RepoError::Store(e) => Self::Internal(e.to_string()),
            RepoError::Serialization(e) => Self::Internal(e),
        }
    }
}

/// User state as returned to clients, with derived leveling fields.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub user_id: String,
    pub profile: Profile,
    pub inventory: Inventory,
    pub version: u64,
    pub exp_to_next: u64,
    pub progress_pct: f64,
}

impl UserView {
    fn from_parts(user_id: &str, user: UserAggregate, version: u64) -> Self {
        Self {
            user_id: user_id.to_string(),
            exp_to_next: user.profile.exp_to_next_level(),
            progress_pct: user.profile.level_progress_pct(),
            profile: user.profile,
            inventory: user.inventory,
            version,
        }
    }
}

/// `UserView` plus the outcome of an experience grant.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelUpView {
    #[serde(flatten)]
    pub user: UserView,
    pub leveled_up: bool,
    pub levels_gained: u32,
    pub gold_reward: u64,
    pub gem_reward: u64,
    pub implementation: Implementation,
}

pub struct UserService {
    repo: Arc<UserRepository>,
    levelup: Arc<ResilientLevelUp>,
}

impl UserService {
    pub fn new(repo: Arc<UserRepository>, levelup: Arc<ResilientLevelUp>) -> Self {
        Self { repo, levelup }
    }

    pub async fn get_user(&self, user_id: &str) -> Result<UserView, ServiceError> {
        let user_id = validate_user_id(user_id)?;
        let found = self.repo.find_one(user_id).await?;
        match found.user {
            Some(user) => Ok(UserView::from_parts(user_id, user, found.version)),
            None => Err(ServiceError::NotFound(user_id.to_string())),
        }
    }

    pub async fn create_user(
        &self,
        user_id: &str,
        nickname: &str,
    ) -> Result<UserView, ServiceError> {
        let user_id = validate_user_id(user_id)?;
        let nickname = Nickname::new(nickname)?;

        let created = self
            .repo
            .find_one_and_upsert(user_id, move |existing| match existing {
                None => Ok(UserAggregate::new_user(nickname.clone(), chrono::Utc::now())),
                Some(_) => Err(RepoError::AlreadyExists(user_id.to_string())),
            })
            .await?;

        tracing::info!(user_id, version = created.version, "User created");
        Ok(UserView::from_parts(user_id, created.user, created.version))
    }

    pub async fn add_exp(&self, user_id: &str, amount: u64) -> Result<LevelUpView, ServiceError> {
        let user_id = validate_user_id(user_id)?;
        if amount == 0 {
            return Err(ServiceError::Validation(
                "Experience amount must be positive".into(),
            ));
        }

        let levelup = self.levelup.clone();
        let updated = self
            .repo
            .find_one_and_update(user_id, move |user| {
                let (result, implementation) = levelup.compute(&user.profile, amount);
                Ok((user.apply_level_up(&result), implementation))
            })
            .await?;

        let (report, implementation) = updated.value;
        if report.levels_gained > 0 {
            tracing::info!(
                user_id,
                old_level = report.old_level,
                new_level = report.new_level,
                "User leveled up"
            );
        }
        Ok(LevelUpView {
            leveled_up: report.levels_gained > 0,
            levels_gained: report.levels_gained,
            gold_reward: report.gold_reward,
            gem_reward: report.gem_reward,
            implementation,
            user: UserView::from_parts(user_id, updated.user, updated.version),
        })
    }

    pub async fn add_item(&self, user_id: &str, item: Item) -> Result<UserView, ServiceError> {
        let user_id = validate_user_id(user_id)?;
        validate_item(&item)?;

        let updated = self
            .repo
            .find_one_and_update(user_id, move |user| {
                user.inventory.add_item(item.clone())?;
                Ok(())
            })
            .await?;

        Ok(UserView::from_parts(user_id, updated.user, updated.version))
    }

    pub async fn purchase(
        &self,
        user_id: &str,
        item: Item,
        gold_cost: u64,
        gem_cost: u64,
    ) -> Result<UserView, ServiceError> {
        let user_id = validate_user_id(user_id)?;
        validate_item(&item)?;
        let item_id = item.id.clone();

        let updated = self
            .repo
            .find_one_and_update(user_id, move |user| {
                user.purchase_item(item.clone(), gold_cost, gem_cost)?;
                Ok(())
            })
            .await?;

        tracing::info!(user_id, item_id = %item_id, gold_cost, gem_cost, "Purchase committed");
        Ok(UserView::from_parts(user_id, updated.user, updated.version))
    }
}

fn validate_user_id(user_id: &str) -> Result<&str, ServiceError> {
    let trimmed = user_id.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::Validation("User id must not be empty".into()));
    }
    Ok(trimmed)
}

fn validate_item(item: &Item) -> Result<(), ServiceError> {
    if item.id.trim().is_empty() {
        return Err(ServiceError::Validation("Item id must not be empty".into()));
    }
    if item.quantity == 0 {
        return Err(ServiceError::Validation(
            "Item quantity must be positive".into(),
        ));
    }
    Ok(())
}
