//! Infrastructure: ports and their concrete implementations.

pub mod levelup;
pub mod memory_store;
pub mod ports;
pub mod redis_store;
pub mod retry;
pub mod settings;
