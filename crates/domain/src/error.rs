//! Unified error type for domain operations.

use thiserror::Error;

/// Errors raised by aggregate business methods.
///
/// These are terminal conditions: a repository update closure that returns
/// one of them must not be retried, because the same input will fail again.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Validation failed (e.g. invalid field values)
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Inventory is at capacity
    #[error("Inventory full: {current}/{capacity} slots")]
    InventoryFull { current: u32, capacity: u32 },

    /// Not enough gold and/or gems for the requested spend
    #[error("Insufficient funds: need {gold_needed} gold / {gems_needed} gems, have {gold_held} / {gems_held}")]
    InsufficientFunds {
        gold_needed: u64,
        gems_needed: u64,
        gold_held: u64,
        gems_held: u64,
    },

    /// Item not present in the inventory
    #[error("Item not found: {0}")]
    ItemNotFound(String),
}

impl DomainError {
    /// Create a validation error for business rule violations.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create an inventory-full error
    pub fn inventory_full(current: u32, capacity: u32) -> Self {
        Self::InventoryFull { current, capacity }
    }

    /// Create an item-not-found error
    pub fn item_not_found(id: impl Into<String>) -> Self {
        Self::ItemNotFound(id.into())
    }
}
