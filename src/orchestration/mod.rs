//! Ledger services: the stateful operations over the repository.
//!
//! Each service owns one concern and is cheap to clone; they share the
//! `Repository` through an `Arc`.

pub mod ingestor;
pub mod membership_ledger;
pub mod player_ledger;
pub mod property_guard;
pub mod ranking;

pub use ingestor::{IngestOutcome, IngestionError, Ingestor, ReconciledOrder, Rejection};
pub use membership_ledger::{DailyLogin, MembershipLedger};
pub use player_ledger::PlayerLedger;
pub use property_guard::{PropertyGuard, PropertySummary};
pub use ranking::RankingService;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("insufficient balance")]
    InsufficientBalance,
    #[error("balance limit exceeded")]
    BalanceLimitExceeded,
    #[error("unknown property: {0}")]
    InvalidProperty(String),
    #[error("level budget exceeded: used {used} + {delta} > total {total}")]
    BudgetExceeded { used: i64, delta: i64, total: i64 },
    #[error("invalid input: {0}")]
    Validation(String),
    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::db::{init_db, Repository};
    use std::sync::Arc;
    use tempfile::TempDir;

    pub async fn setup_repo() -> (Arc<Repository>, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir
            .path()
            .join("test.db")
            .to_string_lossy()
            .to_string();
        let pool = init_db(&db_path).await.expect("init_db failed");
        (Arc::new(Repository::new(pool)), temp_dir)
    }
}
