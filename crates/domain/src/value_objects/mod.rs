//! Validated value objects.

mod nickname;

pub use nickname::Nickname;
