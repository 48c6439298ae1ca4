//! Domain entities for the user aggregate.

mod inventory;
mod item;
mod profile;

pub use inventory::{Inventory, DEFAULT_CAPACITY};
pub use item::{Item, Rarity};
pub use profile::{LevelUpResult, Profile, LEVEL_CAP};
