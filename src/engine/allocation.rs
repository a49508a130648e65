//! Attribute budget check.

use crate::domain::PlayerProperty;

/// Budget figures for a requested property change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocationCheck {
    pub current_level: i64,
    pub level_delta: i64,
    pub used_level: i64,
    pub total_level: i64,
}

impl AllocationCheck {
    pub fn fits(&self) -> bool {
        self.used_level + self.level_delta <= self.total_level
    }

    /// Remaining budget after the change.
    pub fn useable_after(&self) -> i64 {
        self.total_level - self.used_level - self.level_delta
    }
}

pub fn used_level(properties: &[PlayerProperty]) -> i64 {
    properties.iter().map(|p| p.level).sum()
}

/// Evaluate setting `name` to `target_level` against `total_level`.
pub fn check_upgrade(
    properties: &[PlayerProperty],
    name: &str,
    target_level: i64,
    total_level: i64,
) -> AllocationCheck {
    let current_level = properties
        .iter()
        .find(|p| p.name == name)
        .map(|p| p.level)
        .unwrap_or(0);

    AllocationCheck {
        current_level,
        level_delta: target_level - current_level,
        used_level: used_level(properties),
        total_level,
    }
}
