//! Player nickname value object.

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Maximum nickname length in characters.
pub const MAX_NICKNAME_LEN: usize = 50;

/// A validated player nickname: 1-50 characters after trimming.
///
/// Construct through [`Nickname::new`]; the inner string is never empty and
/// never exceeds [`MAX_NICKNAME_LEN`] characters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Nickname(String);

impl Nickname {
    /// Validate and construct a nickname. Leading/trailing whitespace is trimmed.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, DomainError> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(DomainError::validation("nickname is required"));
        }
        if trimmed.chars().count() > MAX_NICKNAME_LEN {
            return Err(DomainError::validation(format!(
                "nickname must be between 1 and {MAX_NICKNAME_LEN} characters"
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Nickname {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for Nickname {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_nickname() {
        let nick = Nickname::new("Bob").expect("valid");
        assert_eq!(nick.as_str(), "Bob");
    }

    #[test]
    fn test_nickname_trims_whitespace() {
        let nick = Nickname::new("  Alice  ").expect("valid");
        assert_eq!(nick.as_str(), "Alice");
    }

    #[test]
    fn test_empty_nickname_rejected() {
        assert!(Nickname::new("").is_err());
        assert!(Nickname::new("   ").is_err());
    }

    #[test]
    fn test_overlong_nickname_rejected() {
        let raw = "x".repeat(MAX_NICKNAME_LEN + 1);
        assert!(Nickname::new(raw).is_err());
    }

    #[test]
    fn test_max_length_accepted() {
        let raw = "x".repeat(MAX_NICKNAME_LEN);
        assert!(Nickname::new(raw).is_ok());
    }

    #[test]
    fn test_serde_transparent() {
        let nick = Nickname::new("Bob").expect("valid");
        let json = serde_json::to_string(&nick).expect("serialize");
        assert_eq!(json, "\"Bob\"");
        let back: Nickname = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, nick);
    }
}
