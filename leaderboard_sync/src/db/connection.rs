//! SQLite connection helpers.
//!
//! [`connect_sqlite`] opens a connection and applies the PRAGMAs every caller
//! relies on: WAL journaling (readers never block the ingestion writer),
//! `foreign_keys=ON` and a 5000ms `busy_timeout`.
//!
//! Example:
//! ```no_run
//! use leaderboard_sync::db::connection::connect_sqlite;
//!
//! let path = std::env::temp_dir().join("leaderboard_example.db");
//! let _conn = connect_sqlite(path.to_str().unwrap()).expect("open sqlite");
//! ```

use diesel::{Connection, ConnectionResult, SqliteConnection, connection::SimpleConnection};

/// Busy timeout applied to every connection, in milliseconds.
pub const BUSY_TIMEOUT_MS: u32 = 5000;

/// Accepts `sqlite://path`, `sqlite:path` or a bare path and returns what
/// SQLite itself expects.
pub fn sqlite_path(database_url: &str) -> &str {
    database_url
        .strip_prefix("sqlite://")
        .or_else(|| database_url.strip_prefix("sqlite:"))
        .unwrap_or(database_url)
}

/// Open a SQLite connection and apply connection-wide PRAGMAs.
pub fn connect_sqlite(database_url: &str) -> ConnectionResult<SqliteConnection> {
    let mut conn = SqliteConnection::establish(sqlite_path(database_url))?;

    conn.batch_execute(&format!(
        "PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON; PRAGMA busy_timeout={BUSY_TIMEOUT_MS};"
    ))
    .map_err(diesel::ConnectionError::CouldntSetupConfiguration)?;
    Ok(conn)
}
