//! Point to level conversion for the two currency families.
//!
//! Both curves are quadratic in the level. `level_for_points` evaluates the closed
//! form and then snaps the estimate against the exact integer totals, so the result
//! is monotonic and `level_for_points(total_points_for_level(l)) == l` regardless of
//! floating-point rounding.

/// Lowest level any player can have.
pub const MIN_LEVEL: i64 = 1;

pub trait LevelCurve {
    /// Accumulated points required to be at `level`.
    fn total_points_for_level(&self, level: i64) -> i64;

    /// Points needed to go from `level` to `level + 1`.
    fn points_to_reach_next_level(&self, level: i64) -> i64;

    /// Closed-form level estimate; may be off by one near boundaries.
    fn estimate_level(&self, points: i64) -> i64;

    fn level_for_points(&self, points: i64) -> i64 {
        if points <= 0 {
            return MIN_LEVEL;
        }
        let mut level = self.estimate_level(points).max(MIN_LEVEL);
        loop {
            let next = self.total_points_for_level(level + 1);
            // i64::MAX means the total saturated
            if next > points || next == i64::MAX {
                break;
            }
            level += 1;
        }
        while level > MIN_LEVEL && self.total_points_for_level(level) > points {
            level -= 1;
        }
        level
    }
}

/// Season points: `total(L) = 50 (L-1) L`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SeasonLevels;

impl LevelCurve for SeasonLevels {
    fn total_points_for_level(&self, level: i64) -> i64 {
        let l = i128::from(level.max(MIN_LEVEL));
        saturate(50 * (l - 1) * l)
    }

    fn points_to_reach_next_level(&self, level: i64) -> i64 {
        100 * level.max(MIN_LEVEL)
    }

    fn estimate_level(&self, points: i64) -> i64 {
        ((points as f64 / 50.0 + 0.25).sqrt() + 0.5).floor() as i64
    }
}

/// Member points: `total(L) = 100 ((L-1)^2 / 4 + 9.75 (L-1)) = 25 (L-1) (L+38)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MemberLevels;

impl LevelCurve for MemberLevels {
    fn total_points_for_level(&self, level: i64) -> i64 {
        let l = i128::from(level.max(MIN_LEVEL));
        saturate(25 * (l - 1) * (l + 38))
    }

    fn points_to_reach_next_level(&self, level: i64) -> i64 {
        50 * (level.max(MIN_LEVEL) + 19)
    }

    fn estimate_level(&self, points: i64) -> i64 {
        ((points as f64 / 25.0 + 380.25).sqrt() - 19.5).floor() as i64 + 1
    }
}

fn saturate(value: i128) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// Attribute budget: season level plus member level.
pub fn total_level(season_points: i64, member_points: i64) -> i64 {
    SeasonLevels.level_for_points(season_points) + MemberLevels.level_for_points(member_points)
}
