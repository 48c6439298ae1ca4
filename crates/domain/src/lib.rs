//! PlayVault domain layer.
//!
//! Pure domain types for the per-user game account aggregate: profile,
//! inventory, items, and the business rules that mutate them. No I/O lives
//! here; persistence and transport belong to the engine crate.

pub mod aggregates;
pub mod entities;
pub mod error;
pub mod value_objects;

pub use aggregates::{LevelUpReport, UserAggregate};
pub use entities::{Inventory, Item, LevelUpResult, Profile, Rarity};
pub use error::DomainError;
pub use value_objects::Nickname;
