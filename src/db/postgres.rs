// PgDatabase — PostgreSQL backend implementing the Database trait.
//
// Uses sqlx PgPool for native async queries. All queries use runtime
// parameter binding (not compile-time macros) to avoid requiring
// DATABASE_URL at compile time.
//
// Key differences from SQLite:
// - JSONB instead of TEXT for the document and reactions
// - `ts` uses the "C" collation so text ordering matches SQLite's byte order
// - channel filters bind a TEXT[] and use `= ANY($n)` instead of IN (...)
// - unique violations are detected via the database error kind

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx_core::pool::Pool;
use sqlx_core::row::Row;
use sqlx_postgres::Postgres;

use super::indexes::IndexSpec;
use super::models::{InsertOutcome, StoredMessage};
use super::traits::Database;

/// Type alias for the PostgreSQL connection pool.
pub type PgPool = Pool<Postgres>;

pub struct PgDatabase {
    pool: PgPool,
}

impl PgDatabase {
    /// Connect to PostgreSQL and run migrations.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPool::connect(database_url)
            .await
            .context("Failed to connect to PostgreSQL")?;

        let db = Self { pool };
        db.run_migrations().await?;
        Ok(db)
    }

    /// Run all pending migrations.
    ///
    /// Holds a session-level advisory lock on a dedicated connection so two
    /// processes starting together don't race to apply the same migration.
    /// The unlock always runs, even if a migration fails.
    async fn run_migrations(&self) -> Result<()> {
        // ASCII "BESTOF" as a big-endian integer.
        const MIGRATION_LOCK_KEY: i64 = 0x4245_5354_4F46;

        let mut lock_conn = self
            .pool
            .acquire()
            .await
            .context("Failed to acquire connection for migration advisory lock")?;

        sqlx_core::query::query("SELECT pg_advisory_lock($1)")
            .bind(MIGRATION_LOCK_KEY)
            .execute(&mut *lock_conn)
            .await
            .context("Failed to acquire migration advisory lock")?;

        let migration_result: Result<()> = async {
            sqlx_core::query::query(
                "CREATE TABLE IF NOT EXISTS schema_version (
                    version INTEGER PRIMARY KEY,
                    applied_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                )",
            )
            .execute(&self.pool)
            .await?;

            let migrations = [(
                1,
                include_str!("../../migrations/postgres/0001_messages.sql"),
            )];

            for (version, sql) in migrations {
                let applied: bool = sqlx_core::query::query(
                    "SELECT COUNT(*) > 0 FROM schema_version WHERE version = $1",
                )
                .bind(version)
                .fetch_one(&self.pool)
                .await
                .map(|row| row.get::<bool, _>(0))
                .with_context(|| format!("Failed to check migration v{version}"))?;

                if !applied {
                    let mut tx = self.pool.begin().await?;
                    sqlx_core::raw_sql::raw_sql(sql).execute(&mut *tx).await?;
                    tx.commit()
                        .await
                        .with_context(|| format!("Migration v{version} failed"))?;
                }
            }

            Ok(())
        }
        .await;

        let unlock_result = sqlx_core::query::query("SELECT pg_advisory_unlock($1)")
            .bind(MIGRATION_LOCK_KEY)
            .execute(&mut *lock_conn)
            .await
            .context("Failed to release migration advisory lock");

        // Migration error takes priority over unlock error.
        migration_result?;
        unlock_result?;

        Ok(())
    }
}

#[async_trait]
impl Database for PgDatabase {
    async fn index_names(&self) -> Result<Vec<String>> {
        let rows = sqlx_core::query::query(
            "SELECT indexname FROM pg_indexes
             WHERE schemaname = current_schema() AND tablename = 'messages'
             ORDER BY indexname",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(|r| r.get::<String, _>(0)).collect())
    }

    async fn create_index(&self, index: &IndexSpec) -> Result<()> {
        sqlx_core::raw_sql::raw_sql(&index.create_sql())
            .execute(&self.pool)
            .await
            .with_context(|| format!("CREATE INDEX {} failed", index.name))?;
        Ok(())
    }

    async fn latest_message_ts(&self, channel_id: &str) -> Result<Option<String>> {
        let row = sqlx_core::query::query(
            "SELECT ts FROM messages WHERE channel_id = $1 ORDER BY ts DESC LIMIT 1",
        )
        .bind(channel_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| r.get::<String, _>(0)))
    }

    async fn insert_message(&self, message: &StoredMessage) -> Result<InsertOutcome> {
        let reactions = message
            .message
            .reactions
            .as_ref()
            .map(serde_json::to_value)
            .transpose()?;
        let document = serde_json::to_value(message)?;

        let result = sqlx_core::query::query(
            "INSERT INTO messages (channel_id, channel_name, ts, user_id, reactions, document)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(&message.channel_id)
        .bind(&message.channel_name)
        .bind(message.ts())
        .bind(message.user())
        .bind(reactions)
        .bind(document)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(InsertOutcome::Inserted),
            Err(sqlx_core::error::Error::Database(e)) if e.is_unique_violation() => {
                Ok(InsertOutcome::Duplicate)
            }
            Err(e) => Err(e).context("Failed to insert message"),
        }
    }

    async fn message_count(&self) -> Result<i64> {
        let row = sqlx_core::query::query("SELECT COUNT(*)::bigint FROM messages")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get::<i64, _>(0))
    }

    async fn distinct_users(&self) -> Result<Vec<String>> {
        let rows = sqlx_core::query::query(
            "SELECT DISTINCT user_id FROM messages WHERE user_id IS NOT NULL ORDER BY user_id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(|r| r.get::<String, _>(0)).collect())
    }

    async fn first_message_ts(
        &self,
        user: &str,
        channel_ids: &[String],
    ) -> Result<Option<String>> {
        let row = sqlx_core::query::query(
            "SELECT ts FROM messages WHERE user_id = $1 AND channel_id = ANY($2)
             ORDER BY ts ASC LIMIT 1",
        )
        .bind(user)
        .bind(channel_ids)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| r.get::<String, _>(0)))
    }

    async fn messages_with_reactions(&self, channel_ids: &[String]) -> Result<Vec<StoredMessage>> {
        let rows = sqlx_core::query::query(
            "SELECT document FROM messages
             WHERE channel_id = ANY($1)
               AND reactions IS NOT NULL
               AND reactions <> '[]'::jsonb
             ORDER BY ts ASC, channel_id ASC",
        )
        .bind(channel_ids)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|r| {
                let document: serde_json::Value = r.get(0);
                serde_json::from_value(document).context("Failed to parse stored message document")
            })
            .collect()
    }
}
