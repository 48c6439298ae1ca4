//! API transport.

pub mod rpc;
