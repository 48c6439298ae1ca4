//! Aggregate roots.

mod user;

pub use user::{LevelUpReport, UserAggregate, STARTING_GEMS, STARTING_GOLD};
