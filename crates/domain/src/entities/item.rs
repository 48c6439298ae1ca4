//! Item entity - stackable objects held in a user's inventory.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Item rarity, strictly ordered for value computation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Rarity {
    Common,
    Uncommon,
    Rare,
    Epic,
    Legendary,
}

impl Rarity {
    /// Multiplier applied when computing an item's total value.
    pub fn value_multiplier(self) -> u64 {
        match self {
            Self::Common => 1,
            Self::Uncommon => 2,
            Self::Rare => 5,
            Self::Epic => 10,
            Self::Legendary => 25,
        }
    }
}

impl std::fmt::Display for Rarity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Common => write!(f, "common"),
            Self::Uncommon => write!(f, "uncommon"),
            Self::Rare => write!(f, "rare"),
            Self::Epic => write!(f, "epic"),
            Self::Legendary => write!(f, "legendary"),
        }
    }
}

/// An object held in a user's inventory, unique by `id` within the list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Item identifier, externally assigned
    pub id: String,
    /// Held quantity, always positive
    pub quantity: u32,
    /// Item level (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<u32>,
    /// Item rarity (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rarity: Option<Rarity>,
    /// Additional free-form item properties
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<Map<String, Value>>,
}

impl Item {
    /// Quantity is not checked here; `Inventory::add_item` rejects zero.
    pub fn new(id: impl Into<String>, quantity: u32) -> Self {
        Self {
            id: id.into(),
            quantity,
            level: None,
            rarity: None,
            properties: None,
        }
    }

    pub fn with_level(mut self, level: u32) -> Self {
        self.level = Some(level);
        self
    }

    pub fn with_rarity(mut self, rarity: Rarity) -> Self {
        self.rarity = Some(rarity);
        self
    }

    /// An item held in quantity greater than one is a stack.
    pub fn is_stackable(&self) -> bool {
        self.quantity > 1
    }

    /// Total value: level x rarity multiplier x quantity.
    pub fn total_value(&self) -> u64 {
        let level = u64::from(self.level.unwrap_or(1));
        let multiplier = self.rarity.map_or(1, Rarity::value_multiplier);
        level * multiplier * u64::from(self.quantity)
    }

    /// Whether the item can still be upgraded (levelled items cap at 100).
    pub fn can_upgrade(&self) -> bool {
        matches!(self.level, Some(level) if level < 100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rarity_ordering() {
        assert!(Rarity::Common < Rarity::Uncommon);
        assert!(Rarity::Uncommon < Rarity::Rare);
        assert!(Rarity::Rare < Rarity::Epic);
        assert!(Rarity::Epic < Rarity::Legendary);
    }

    #[test]
    fn test_total_value_uses_level_and_rarity() {
        let item = Item::new("sword_iron", 2)
            .with_level(3)
            .with_rarity(Rarity::Rare);
        assert_eq!(item.total_value(), 3 * 5 * 2);
    }

    #[test]
    fn test_total_value_defaults() {
        // No level, no rarity: 1 * 1 * quantity
        let item = Item::new("stick", 4);
        assert_eq!(item.total_value(), 4);
    }

    #[test]
    fn test_stackable() {
        assert!(!Item::new("gem", 1).is_stackable());
        assert!(Item::new("gem", 2).is_stackable());
    }

    #[test]
    fn test_can_upgrade() {
        assert!(!Item::new("stick", 1).can_upgrade());
        assert!(Item::new("sword", 1).with_level(99).can_upgrade());
        assert!(!Item::new("sword", 1).with_level(100).can_upgrade());
    }

    #[test]
    fn test_rarity_serde_lowercase() {
        let json = serde_json::to_string(&Rarity::Legendary).expect("serialize");
        assert_eq!(json, "\"legendary\"");
    }
}
