//! User aggregate - the unit of persistence and concurrency.
//!
//! One aggregate per user, identified externally by a string user id. The
//! aggregate is stored and versioned as a whole; concurrent mutation is
//! resolved by the engine's optimistic-concurrency repository, so all methods
//! here operate on plain in-memory state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entities::{Inventory, Item, LevelUpResult, Profile, DEFAULT_CAPACITY};
use crate::error::DomainError;
use crate::value_objects::Nickname;

/// Gold granted to a freshly created user.
pub const STARTING_GOLD: u64 = 1000;
/// Gems granted to a freshly created user.
pub const STARTING_GEMS: u64 = 50;

/// Gold reward per level gained.
const GOLD_PER_LEVEL: u64 = 500;
/// Gem reward per level gained.
const GEMS_PER_LEVEL: u64 = 10;

/// Full persisted state for one user: profile + inventory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserAggregate {
    pub profile: Profile,
    pub inventory: Inventory,
}

/// Result of a level-up pass including the rewards granted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelUpReport {
    pub old_level: u32,
    pub new_level: u32,
    pub levels_gained: u32,
    pub gold_reward: u64,
    pub gem_reward: u64,
}

impl UserAggregate {
    /// Factory for a brand-new user: level 1, zero exp, seeded currency,
    /// empty item list.
    pub fn new_user(nickname: Nickname, created_at: DateTime<Utc>) -> Self {
        Self {
            profile: Profile::new(nickname, created_at),
            inventory: Inventory::new(STARTING_GOLD, STARTING_GEMS, DEFAULT_CAPACITY),
        }
    }

    /// Add experience and grant per-level rewards for any levels gained.
    pub fn process_level_up(&mut self, exp_amount: u64) -> LevelUpReport {
        let result = self.profile.with_exp_added(exp_amount);
        self.apply_level_up(&result)
    }

    /// Adopt an externally computed level-up result and grant rewards.
    pub fn apply_level_up(&mut self, result: &LevelUpResult) -> LevelUpReport {
        let old_level = self.profile.level;
        let levels_gained = result.levels_gained;
        self.profile = result.profile.clone();

        let gold_reward = u64::from(levels_gained) * GOLD_PER_LEVEL;
        let gem_reward = u64::from(levels_gained) * GEMS_PER_LEVEL;
        self.inventory.gold = self.inventory.gold.saturating_add(gold_reward);
        self.inventory.gems = self.inventory.gems.saturating_add(gem_reward);

        LevelUpReport {
            old_level,
            new_level: self.profile.level,
            levels_gained,
            gold_reward,
            gem_reward,
        }
    }

    /// Buy an item: check funds and capacity, spend, then add.
    ///
    /// Runs entirely in memory; when invoked from a repository update closure
    /// the whole purchase commits (or conflicts) as one versioned write.
    pub fn purchase_item(
        &mut self,
        item: Item,
        gold_cost: u64,
        gem_cost: u64,
    ) -> Result<(), DomainError> {
        if !self.inventory.has_currency(gold_cost, gem_cost) {
            return Err(DomainError::InsufficientFunds {
                gold_needed: gold_cost,
                gems_needed: gem_cost,
                gold_held: self.inventory.gold,
                gems_held: self.inventory.gems,
            });
        }
        // Capacity check happens before spending so a full inventory cannot
        // eat the player's currency.
        if self.inventory.find_item(&item.id).is_none() && self.inventory.is_full() {
            return Err(DomainError::inventory_full(
                self.inventory.items.len() as u32,
                self.inventory.capacity,
            ));
        }
        self.inventory.spend_currency(gold_cost, gem_cost)?;
        self.inventory.add_item(item)
    }
}
