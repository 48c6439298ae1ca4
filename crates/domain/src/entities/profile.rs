//! Profile entity - leveling and experience.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value_objects::Nickname;

/// Maximum reachable level.
pub const LEVEL_CAP: u32 = 100;

/// Total experience required to hold `level`.
///
/// This is the canonical flat-rate formula. The level-up computation port in
/// the engine may be backed by a native module with its own curve, but
/// everything persisted by this server uses this one.
pub fn exp_required_for_level(level: u32) -> u64 {
    u64::from(level) * 1000
}

/// Player profile. `created_at` is set once at creation and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub nickname: Nickname,
    pub level: u32,
    pub exp: u64,
    pub avatar: String,
    pub created_at: DateTime<Utc>,
}

/// Outcome of applying an experience delta to a profile.
///
/// This is the typed contract of the level-up computation boundary: both the
/// in-process fallback and any native implementation produce this shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelUpResult {
    pub profile: Profile,
    pub levels_gained: u32,
    pub leveled_up: bool,
    pub exp_to_next: u64,
    pub progress_pct: f64,
}

impl Profile {
    /// Fresh level-1 profile with zero experience.
    pub fn new(nickname: Nickname, created_at: DateTime<Utc>) -> Self {
        Self {
            nickname,
            level: 1,
            exp: 0,
            avatar: "default".to_string(),
            created_at,
        }
    }

    /// Experience still missing for the next level. Zero at the level cap.
    pub fn exp_to_next_level(&self) -> u64 {
        if self.level >= LEVEL_CAP {
            return 0;
        }
        exp_required_for_level(self.level + 1).saturating_sub(self.exp)
    }

    /// Progress towards the next level as a percentage in [0, 100].
    pub fn level_progress_pct(&self) -> f64 {
        if self.level >= LEVEL_CAP {
            return 100.0;
        }
        let floor = exp_required_for_level(self.level);
        let ceiling = exp_required_for_level(self.level + 1);
        let span = (ceiling - floor) as f64;
        let into = self.exp.saturating_sub(floor) as f64;
        (into / span * 100.0).clamp(0.0, 100.0)
    }

    pub fn can_level_up(&self) -> bool {
        self.level < LEVEL_CAP && self.exp >= exp_required_for_level(self.level + 1)
    }

    /// Add experience and promote the level while the threshold is met.
    ///
    /// Monotonic: neither `exp` nor `level` ever decreases, and `level` caps
    /// at [`LEVEL_CAP`] regardless of further experience. Returns the number
    /// of levels gained.
    pub fn add_exp(&mut self, amount: u64) -> u32 {
        self.exp = self.exp.saturating_add(amount);
        let mut levels_gained = 0;
        while self.can_level_up() {
            self.level += 1;
            levels_gained += 1;
        }
        levels_gained
    }

    /// Apply an experience delta to a copy of this profile, returning the
    /// full [`LevelUpResult`]. The receiver is untouched.
    pub fn with_exp_added(&self, amount: u64) -> LevelUpResult {
        let mut profile = self.clone();
        let levels_gained = profile.add_exp(amount);
        LevelUpResult {
            exp_to_next: profile.exp_to_next_level(),
            progress_pct: profile.level_progress_pct(),
            leveled_up: levels_gained > 0,
            levels_gained,
            profile,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> Profile {
        Profile::new(Nickname::new("Tester").expect("valid"), Utc::now())
    }

    #[test]
    fn test_new_profile_starts_at_level_one() {
        let p = profile();
        assert_eq!(p.level, 1);
        assert_eq!(p.exp, 0);
        assert_eq!(p.avatar, "default");
    }

    #[test]
    fn test_add_exp_levels_up() {
        let mut p = profile();
        // Level 2 requires 2000 exp total.
        let gained = p.add_exp(2000);
        assert_eq!(gained, 1);
        assert_eq!(p.level, 2);
        assert_eq!(p.exp, 2000);
    }

    #[test]
    fn test_add_exp_multiple_levels() {
        let mut p = profile();
        // 5000 exp covers levels 2 (2000), 3 (3000), 4 (4000), 5 (5000).
        let gained = p.add_exp(5000);
        assert_eq!(gained, 4);
        assert_eq!(p.level, 5);
    }

    #[test]
    fn test_add_exp_below_threshold() {
        let mut p = profile();
        assert_eq!(p.add_exp(1999), 0);
        assert_eq!(p.level, 1);
        assert_eq!(p.exp, 1999);
    }

    #[test]
    fn test_leveling_is_monotonic() {
        let mut p = profile();
        let mut last_level = p.level;
        let mut last_exp = p.exp;
        for delta in [0, 500, 1500, 0, 10_000, 3] {
            p.add_exp(delta);
            assert!(p.level >= last_level);
            assert!(p.exp >= last_exp);
            last_level = p.level;
            last_exp = p.exp;
        }
    }

    #[test]
    fn test_level_caps_at_100() {
        let mut p = profile();
        p.add_exp(u64::from(LEVEL_CAP) * 1000 * 2);
        assert_eq!(p.level, LEVEL_CAP);
        // Further exp accumulates but the level stays capped.
        p.add_exp(1_000_000);
        assert_eq!(p.level, LEVEL_CAP);
        assert_eq!(p.exp_to_next_level(), 0);
        assert_eq!(p.level_progress_pct(), 100.0);
    }

    #[test]
    fn test_exp_to_next_level() {
        let mut p = profile();
        p.add_exp(500);
        assert_eq!(p.exp_to_next_level(), 1500);
    }

    #[test]
    fn test_with_exp_added_leaves_original_untouched() {
        let p = profile();
        let result = p.with_exp_added(2000);
        assert_eq!(p.level, 1);
        assert_eq!(result.profile.level, 2);
        assert!(result.leveled_up);
        assert_eq!(result.levels_gained, 1);
    }

    #[test]
    fn test_progress_pct_bounds() {
        let mut p = profile();
        p.add_exp(1500);
        let pct = p.level_progress_pct();
        assert!((0.0..=100.0).contains(&pct));
    }
}
