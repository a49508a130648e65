//! Domain effects a purchased product maps to.

use crate::domain::Tier;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What a catalog product grants, before quantity is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProductKind {
    Membership { tier: Tier },
    /// Member points per purchased unit.
    PointPackage { points: i64 },
    OneTimeReset,
}

/// A classified purchase with quantity applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductEffect {
    NormalMembership { months: i64 },
    PremiumMembership { months: i64 },
    PointPackage { points: i64 },
    OneTimeReset,
}

impl fmt::Display for ProductEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProductEffect::NormalMembership { months } => {
                write!(f, "normal_membership x{}", months)
            }
            ProductEffect::PremiumMembership { months } => {
                write!(f, "premium_membership x{}", months)
            }
            ProductEffect::PointPackage { points } => write!(f, "point_package {}", points),
            ProductEffect::OneTimeReset => write!(f, "one_time_reset"),
        }
    }
}
