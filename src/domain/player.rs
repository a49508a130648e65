//! Player economy record.

use crate::domain::AccountId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Conduct score bounds.
pub const CONDUCT_MIN: i64 = 0;
pub const CONDUCT_MAX: i64 = 100;

/// Upper bound for either currency balance. Keeps every stored total and every
/// `total + delta` inside SQLite's 64-bit integer range.
pub const POINT_MAX: i64 = 1_000_000_000_000;

/// A player's currencies, match statistics and conduct score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub account_id: AccountId,
    pub season_point_total: i64,
    pub member_point_total: i64,
    pub match_count: i64,
    pub win_count: i64,
    pub disconnect_count: i64,
    /// Always within `[CONDUCT_MIN, CONDUCT_MAX]`.
    pub conduct_point: i64,
    pub last_match_time: Option<DateTime<Utc>>,
}

impl Player {
    /// A freshly created player: zero currencies and counters, full conduct.
    pub fn new(account_id: AccountId) -> Self {
        Self {
            account_id,
            season_point_total: 0,
            member_point_total: 0,
            match_count: 0,
            win_count: 0,
            disconnect_count: 0,
            conduct_point: CONDUCT_MAX,
            last_match_time: None,
        }
    }
}

/// Signed change to a player's two currencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PointDelta {
    pub season: i64,
    pub member: i64,
}

impl PointDelta {
    pub fn season(points: i64) -> Self {
        Self {
            season: points,
            member: 0,
        }
    }

    pub fn member(points: i64) -> Self {
        Self {
            season: 0,
            member: points,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.season == 0 && self.member == 0
    }

    /// Both components lie within `[-POINT_MAX, POINT_MAX]`.
    pub fn within_bounds(&self) -> bool {
        let range = -POINT_MAX..=POINT_MAX;
        range.contains(&self.season) && range.contains(&self.member)
    }

    /// Sum of two deltas; `None` once either component leaves the bounds.
    pub fn checked_add(self, other: PointDelta) -> Option<PointDelta> {
        let sum = PointDelta {
            season: self.season.checked_add(other.season)?,
            member: self.member.checked_add(other.member)?,
        };
        sum.within_bounds().then_some(sum)
    }

    /// Whether applying this delta to `player` would push a balance past `POINT_MAX`.
    pub fn overflows(&self, player: &Player) -> bool {
        player.season_point_total.saturating_add(self.season) > POINT_MAX
            || player.member_point_total.saturating_add(self.member) > POINT_MAX
    }
}

/// Outcome of a single match as reported by the game server.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchResult {
    pub is_winner: bool,
    /// Raw reported value; sanitized by [`MatchResult::earned_points`].
    pub season_points_earned: Option<f64>,
    pub disconnected: bool,
}

impl MatchResult {
    /// Season points to credit, at most `POINT_MAX`. Missing, non-finite or
    /// negative input counts as zero.
    pub fn earned_points(&self) -> i64 {
        match self.season_points_earned {
            Some(p) if p.is_finite() && p > 0.0 => p.trunc().min(POINT_MAX as f64) as i64,
            _ => 0,
        }
    }

    /// Conduct adjustment: -5 on disconnect, +1 otherwise.
    pub fn conduct_delta(&self) -> i64 {
        if self.disconnected {
            -5
        } else {
            1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(points: Option<f64>, disconnected: bool) -> MatchResult {
        MatchResult {
            is_winner: false,
            season_points_earned: points,
            disconnected,
        }
    }

    #[test]
    fn test_earned_points_sanitizes_invalid_input() {
        assert_eq!(result(None, false).earned_points(), 0);
        assert_eq!(result(Some(f64::NAN), false).earned_points(), 0);
        assert_eq!(result(Some(f64::INFINITY), false).earned_points(), 0);
        assert_eq!(result(Some(-12.0), false).earned_points(), 0);
        assert_eq!(result(Some(37.9), false).earned_points(), 37);
    }

    #[test]
    fn test_earned_points_capped() {
        assert_eq!(result(Some(1e30), false).earned_points(), POINT_MAX);
        assert_eq!(result(Some(f64::MAX), false).earned_points(), POINT_MAX);
    }

    #[test]
    fn test_delta_bounds() {
        assert!(PointDelta::season(POINT_MAX).within_bounds());
        assert!(PointDelta::member(-POINT_MAX).within_bounds());
        assert!(!PointDelta::season(POINT_MAX + 1).within_bounds());
        assert!(!PointDelta::member(i64::MIN).within_bounds());

        let sum = PointDelta::season(5).checked_add(PointDelta::member(7));
        assert_eq!(sum, Some(PointDelta { season: 5, member: 7 }));
        assert_eq!(
            PointDelta::member(POINT_MAX).checked_add(PointDelta::member(1)),
            None
        );
        assert_eq!(
            PointDelta::member(i64::MAX).checked_add(PointDelta::member(1)),
            None
        );
    }

    #[test]
    fn test_delta_overflows_player() {
        let mut player = Player::new(AccountId::new(1));
        player.member_point_total = POINT_MAX - 10;
        assert!(!PointDelta::member(10).overflows(&player));
        assert!(PointDelta::member(11).overflows(&player));
        assert!(!PointDelta::member(-50).overflows(&player));
    }

    #[test]
    fn test_conduct_delta() {
        assert_eq!(result(None, true).conduct_delta(), -5);
        assert_eq!(result(None, false).conduct_delta(), 1);
    }

    #[test]
    fn test_new_player_defaults() {
        let p = Player::new(AccountId::new(42));
        assert_eq!(p.season_point_total, 0);
        assert_eq!(p.member_point_total, 0);
        assert_eq!(p.conduct_point, CONDUCT_MAX);
        assert!(p.last_match_time.is_none());
    }
}
