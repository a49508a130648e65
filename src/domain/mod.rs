//! Domain types for the player economy ledger.
//!
//! This module provides:
//! - Primitives: AccountId, Provider, Tier
//! - Player, Membership and PlayerProperty records
//! - Payment orders, provider contact links and product effects
//! - Daily ranking snapshots

pub mod membership;
pub mod order;
pub mod player;
pub mod primitives;
pub mod product;
pub mod property;
pub mod ranking;

pub use membership::Membership;
pub use order::{OrderOutcome, OrderSettlement, OrderStatus, PaymentOrder, ProviderAccountLink};
pub use player::{MatchResult, Player, PointDelta, POINT_MAX};
pub use primitives::{AccountId, AccountIdParseError, Provider, Tier};
pub use product::{ProductEffect, ProductKind};
pub use property::PlayerProperty;
pub use ranking::RankingSnapshot;
