//! Inventory entity - currency, capacity, and item stacking.

use serde::{Deserialize, Serialize};

use crate::entities::Item;
use crate::error::DomainError;

/// Default number of item slots for a new inventory.
pub const DEFAULT_CAPACITY: u32 = 50;

/// A user's inventory.
///
/// Invariants protected by the mutation methods:
/// - `items.len() <= capacity` at all times
/// - item ids are unique within `items` (same-id adds merge quantities)
/// - gold/gems never go negative (all-or-nothing spends)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Inventory {
    pub gold: u64,
    pub gems: u64,
    pub capacity: u32,
    pub items: Vec<Item>,
}

impl Inventory {
    pub fn new(gold: u64, gems: u64, capacity: u32) -> Self {
        Self {
            gold,
            gems,
            capacity,
            items: Vec::new(),
        }
    }

    pub fn is_full(&self) -> bool {
        self.items.len() >= self.capacity as usize
    }

    pub fn available_slots(&self) -> u32 {
        self.capacity.saturating_sub(self.items.len() as u32)
    }

    pub fn find_item(&self, item_id: &str) -> Option<&Item> {
        self.items.iter().find(|i| i.id == item_id)
    }

    /// Add an item, merging quantity into an existing same-id entry.
    ///
    /// A merge never consumes a slot; a genuinely new item is rejected with
    /// [`DomainError::InventoryFull`] when the inventory is at capacity (the
    /// add is refused outright, never truncated). A zero quantity is rejected
    /// so no empty stack can occupy a slot.
    pub fn add_item(&mut self, item: Item) -> Result<(), DomainError> {
        if item.quantity == 0 {
            return Err(DomainError::validation("item quantity must be positive"));
        }
        if let Some(existing) = self.items.iter_mut().find(|i| i.id == item.id) {
            existing.quantity = existing.quantity.saturating_add(item.quantity);
            return Ok(());
        }
        if self.is_full() {
            return Err(DomainError::inventory_full(
                self.items.len() as u32,
                self.capacity,
            ));
        }
        self.items.push(item);
        Ok(())
    }

    /// Remove up to `quantity` of an item, dropping the entry when the count
    /// reaches zero.
    pub fn remove_item(&mut self, item_id: &str, quantity: u32) -> Result<(), DomainError> {
        let Some(index) = self.items.iter().position(|i| i.id == item_id) else {
            return Err(DomainError::item_not_found(item_id));
        };
        if self.items[index].quantity <= quantity {
            self.items.remove(index);
        } else {
            self.items[index].quantity -= quantity;
        }
        Ok(())
    }

    pub fn has_currency(&self, gold: u64, gems: u64) -> bool {
        self.gold >= gold && self.gems >= gems
    }

    /// Spend gold and gems, all-or-nothing.
    ///
    /// No mutation happens unless BOTH balances are sufficient.
    pub fn spend_currency(&mut self, gold: u64, gems: u64) -> Result<(), DomainError> {
        if !self.has_currency(gold, gems) {
            return Err(DomainError::InsufficientFunds {
                gold_needed: gold,
                gems_needed: gems,
                gold_held: self.gold,
                gems_held: self.gems,
            });
        }
        self.gold -= gold;
        self.gems -= gems;
        Ok(())
    }

    /// Sum of `Item::total_value` over all held items.
    pub fn total_value(&self) -> u64 {
        self.items.iter().map(Item::total_value).sum()
    }
}
