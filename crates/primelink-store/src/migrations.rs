//! # SqliteStore Migrations
//!
//! Embedded SQL migrations for the snapshot store.
//!
//! ## Adding New Migrations
//!
//! 1. Create a new file in `migrations/sqlite/` with the next sequence number
//! 2. Name format: `NNN_description.sql` (e.g., `002_add_history.sql`)
//! 3. Write idempotent SQL (use `IF NOT EXISTS` where possible)
//! 4. **NEVER** modify existing migrations - always add new ones

use sqlx::SqlitePool;
use tracing::info;

use crate::error::StoreResult;

/// Migrations from `migrations/sqlite`, embedded at compile time.
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Runs all pending migrations in filename order.
pub async fn run_migrations(pool: &SqlitePool) -> StoreResult<()> {
    MIGRATOR.run(pool).await?;
    info!(count = MIGRATOR.iter().count(), "Migrations verified");
    Ok(())
}
