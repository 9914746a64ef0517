// SqliteDatabase — rusqlite backend implementing the Database trait.
//
// The Connection is wrapped in tokio::sync::Mutex because Connection is !Send.
// Trait methods lock the mutex, do synchronous rusqlite work, and return.
// The lock is never held across .await points — Rust enforces this because
// MutexGuard is !Send.

use anyhow::Result;
use async_trait::async_trait;
use rusqlite::Connection;
use tokio::sync::Mutex;

use super::indexes::IndexSpec;
use super::models::{InsertOutcome, StoredMessage};
use super::traits::Database;

pub struct SqliteDatabase {
    conn: Mutex<Connection>,
}

impl SqliteDatabase {
    /// Wrap an already-opened rusqlite Connection.
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }
}

#[async_trait]
impl Database for SqliteDatabase {
    async fn index_names(&self) -> Result<Vec<String>> {
        let conn = self.conn.lock().await;
        super::schema::index_names(&conn)
    }

    async fn create_index(&self, index: &IndexSpec) -> Result<()> {
        let conn = self.conn.lock().await;
        super::schema::create_index(&conn, index)
    }

    async fn latest_message_ts(&self, channel_id: &str) -> Result<Option<String>> {
        let conn = self.conn.lock().await;
        super::queries::latest_message_ts(&conn, channel_id)
    }

    async fn insert_message(&self, message: &StoredMessage) -> Result<InsertOutcome> {
        let conn = self.conn.lock().await;
        super::queries::insert_message(&conn, message)
    }

    async fn message_count(&self) -> Result<i64> {
        let conn = self.conn.lock().await;
        super::queries::message_count(&conn)
    }

    async fn distinct_users(&self) -> Result<Vec<String>> {
        let conn = self.conn.lock().await;
        super::queries::distinct_users(&conn)
    }

    async fn first_message_ts(
        &self,
        user: &str,
        channel_ids: &[String],
    ) -> Result<Option<String>> {
        let conn = self.conn.lock().await;
        super::queries::first_message_ts(&conn, user, channel_ids)
    }

    async fn messages_with_reactions(&self, channel_ids: &[String]) -> Result<Vec<StoredMessage>> {
        let conn = self.conn.lock().await;
        super::queries::messages_with_reactions(&conn, channel_ids)
    }
}
