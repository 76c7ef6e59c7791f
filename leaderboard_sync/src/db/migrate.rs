//! Embedded schema migrations.

use anyhow::{Context, anyhow};
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use tracing::info;

use crate::db::connection::connect_sqlite;

/// Embedded Diesel migrations bundled with this crate.
///
/// Applied by [`run_sqlite`] to bring the database schema up to date.
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Runs pending migrations on the SQLite database at `url`, returning how many
/// were applied.
pub fn run_sqlite(url: &str) -> anyhow::Result<usize> {
    let mut conn = connect_sqlite(url).with_context(|| format!("opening {url}"))?;
    let applied = conn
        .run_pending_migrations(MIGRATIONS)
        .map_err(|e| anyhow!(e))
        .with_context(|| format!("migrating {url}"))?;

    info!(url, applied = applied.len(), "database schema up to date");
    Ok(applied.len())
}
