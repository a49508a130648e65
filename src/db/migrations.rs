//! Database initialization and schema migrations.

use sqlx::sqlite::{SqliteConnection, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use tracing::info;

const SCHEMA_SQL: &str = include_str!("schema.sql");

/// Open (creating if needed) the ledger database and apply the schema.
pub async fn init_db(db_path: &str) -> Result<SqlitePool, sqlx::Error> {
    if let Some(parent) = Path::new(db_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).ok();
        }
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .after_connect(|conn, _meta| Box::pin(async move { configure_pragmas(conn).await }))
        .connect(&format!("sqlite:{}?mode=rwc", db_path))
        .await?;

    run_migrations(&pool).await?;

    info!(path = %db_path, "Ledger database ready");
    Ok(pool)
}

/// Apply every statement of the schema. Statements are idempotent.
async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let mut applied = 0usize;
    for statement in SCHEMA_SQL.split(';') {
        let trimmed = statement.trim();
        if !trimmed.is_empty() {
            sqlx::query(trimmed).execute(pool).await?;
            applied += 1;
        }
    }

    info!(statements = applied, "Schema migrations applied");
    Ok(())
}

/// WAL plus a busy timeout lets concurrent request handlers share the file.
async fn configure_pragmas(conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    use sqlx::Row;

    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&mut *conn)
        .await?;
    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&mut *conn)
        .await?;

    // journal_mode reports the mode actually in effect
    let row = sqlx::query("PRAGMA journal_mode = WAL")
        .fetch_one(&mut *conn)
        .await?;
    let journal_mode: String = row.get(0);

    sqlx::query("PRAGMA synchronous = NORMAL")
        .execute(&mut *conn)
        .await?;

    tracing::debug!(journal_mode = %journal_mode, "SQLite connection configured");
    Ok(())
}
