//! Purchasable player attributes.

use serde::{Deserialize, Serialize};

/// Attribute names a player may allocate levels to.
pub const PROPERTY_NAMES: &[&str] = &[
    "property_cooldown_percentage",
    "property_cast_range_bonus_stacking",
    "property_spell_amplify_percentage",
    "property_status_resistance_stacking",
    "property_evasion_constant",
    "property_magical_resistance_bonus",
    "property_incoming_damage_percentage",
    "property_attack_range_bonus",
    "property_physical_armor_bonus",
    "property_preattack_bonus_damage",
    "property_attackspeed_bonus_constant",
    "property_movespeed_bonus_constant",
    "property_health_regen_percentage",
    "property_mana_regen_total_percentage",
    "property_lifesteal",
    "property_spell_lifesteal",
    "property_ignore_movespeed_limit",
    "property_cannot_miss",
];

pub fn is_known_property(name: &str) -> bool {
    PROPERTY_NAMES.contains(&name)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerProperty {
    pub name: String,
    pub level: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allow_list() {
        assert!(is_known_property("property_lifesteal"));
        assert!(!is_known_property("property_godmode"));
        assert!(!is_known_property(""));
    }
}
