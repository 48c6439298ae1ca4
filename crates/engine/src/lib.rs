//! PlayVault Engine - server-side crate.
//!
//! Layers, outermost first:
//! - `api`: JSON-RPC transport over axum
//! - `application`: request validation and orchestration
//! - `repositories`: versioned aggregate persistence with conflict retry
//! - `infrastructure`: port traits and their Redis / in-memory / local
//!   implementations

pub mod api;
pub mod app;
pub mod application;
pub mod infrastructure;
pub mod repositories;
