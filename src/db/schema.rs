// Database schema — table creation and index introspection for SQLite.
//
// The messages table mirrors a document collection: a handful of extracted
// columns to filter and sort on, plus the full JSON document. Indexes are not
// created here; `db::indexes::ensure_indexes` owns them so that every backend
// goes through the same check-then-create step.

use anyhow::{Context, Result};
use rusqlite::Connection;

use super::indexes::IndexSpec;

/// Create the messages table if it doesn't exist yet.
///
/// This is idempotent — safe to call on every startup.
pub fn create_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS messages (
            channel_id TEXT NOT NULL,
            channel_name TEXT NOT NULL,
            ts TEXT NOT NULL,                  -- Slack ts, e.g. '1577836800.000200'
            user_id TEXT,                      -- NULL for bot/system messages
            reactions TEXT,                    -- JSON array, NULL when absent
            document TEXT NOT NULL,            -- the full annotated message as JSON
            synced_at TEXT NOT NULL DEFAULT (datetime('now'))
        );
        ",
    )
    .context("Failed to create database tables")?;

    Ok(())
}

/// Names of the user-created indexes on the messages table.
///
/// SQLite's own automatic indexes (`sqlite_autoindex_*`) are skipped.
pub fn index_names(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master
         WHERE type = 'index' AND tbl_name = 'messages' AND name NOT LIKE 'sqlite_%'
         ORDER BY name",
    )?;
    let names = stmt
        .query_map([], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<String>>>()?;
    Ok(names)
}

/// Create an index on the messages table.
pub fn create_index(conn: &Connection, index: &IndexSpec) -> Result<()> {
    conn.execute_batch(&index.create_sql())
        .with_context(|| format!("CREATE INDEX {} failed", index.name))?;
    Ok(())
}
