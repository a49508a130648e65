pub mod analytics;
pub mod api;
pub mod config;
pub mod db;
pub mod domain;
pub mod engine;
pub mod error;
pub mod orchestration;
pub mod payments;

pub use analytics::{AnalyticsSink, HttpAnalyticsSink, MockAnalytics, NoopAnalytics};
pub use config::{Config, LedgerConfig};
pub use db::{init_db, Repository};
pub use domain::{AccountId, Membership, PaymentOrder, Player, Provider, Tier};
pub use error::AppError;
pub use payments::ProductCatalog;
