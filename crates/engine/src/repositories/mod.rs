//! Repositories: aggregate persistence over the version store.

mod user;

pub use user::{FindResult, RepoError, Updated, UserRepository};
