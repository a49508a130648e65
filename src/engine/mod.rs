//! Pure computation for ledger rules: levels, membership time, attribute budget.

pub mod allocation;
pub mod levels;
pub mod membership;

pub use allocation::{check_upgrade, AllocationCheck};
pub use levels::{total_level, LevelCurve, MemberLevels, SeasonLevels};
pub use membership::{apply_purchase, ExpiryOutOfRange, MembershipChange, Transition};
