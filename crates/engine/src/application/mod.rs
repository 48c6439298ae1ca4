//! Application services: the operations exposed over the API.

mod user_service;

pub use user_service::{LevelUpView, ServiceError, UserService, UserView};
