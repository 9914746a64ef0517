// Database layer — the message store behind the Database trait.
//
// SQLite (rusqlite, "bundled" so there's no system dependency) is the default
// backend; PostgreSQL is available behind the `postgres` feature. Both keep
// the same `messages` table and the same two indexes.

pub mod indexes;
pub mod models;
pub mod traits;

#[cfg(feature = "postgres")]
pub mod postgres;
#[cfg(feature = "sqlite")]
pub mod queries;
#[cfg(feature = "sqlite")]
pub mod schema;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use traits::Database;

use anyhow::Result;
use std::sync::Arc;

/// Open (or create) a SQLite database file and create the messages table.
#[cfg(feature = "sqlite")]
pub fn open_sqlite(db_path: &str) -> Result<Arc<dyn Database>> {
    use anyhow::Context;
    use std::path::Path;

    // Create parent directories if needed
    if let Some(parent) = Path::new(db_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory for database: {db_path}"))?;
        }
    }

    let conn = rusqlite::Connection::open(db_path)
        .with_context(|| format!("Failed to open database at {db_path}"))?;

    // WAL keeps readers unblocked while a sync is writing
    conn.pragma_update(None, "journal_mode", "WAL")?;

    schema::create_tables(&conn)?;

    Ok(Arc::new(sqlite::SqliteDatabase::new(conn)))
}

/// A throwaway in-memory SQLite store (used by tests and dry runs).
#[cfg(feature = "sqlite")]
pub fn open_sqlite_in_memory() -> Result<Arc<dyn Database>> {
    let conn = rusqlite::Connection::open_in_memory()?;
    schema::create_tables(&conn)?;
    Ok(Arc::new(sqlite::SqliteDatabase::new(conn)))
}

/// Connect to PostgreSQL and run migrations.
#[cfg(feature = "postgres")]
pub async fn connect_postgres(database_url: &str) -> Result<Arc<dyn Database>> {
    let db = postgres::PgDatabase::connect(database_url).await?;
    Ok(Arc::new(db))
}
