use anyhow::Result;
use chrono::Utc;
use shared::{HistoryAction, HistoryEntry, NewHistoryEntry};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{migrate::MigrateDatabase, Row, Sqlite, SqlitePool};
use std::sync::Arc;
use tracing::info;

/// Default on-disk database
pub const DATABASE_URL: &str = "sqlite:coach.db";

/// SQLite access for the value slots and the history table
#[derive(Clone)]
pub struct DbConnection {
    pool: Arc<SqlitePool>,
}

impl DbConnection {
    /// Open (creating the file if needed) and migrate the database at `url`
    pub async fn new(url: &str) -> Result<Self> {
        if !Sqlite::database_exists(url).await.unwrap_or(false) {
            info!("Creating database {}", url);
            Sqlite::create_database(url).await?;
        }

        let pool = SqlitePool::connect(url).await?;
        Self::migrate(&pool).await?;
        Ok(Self { pool: Arc::new(pool) })
    }

    /// Private in-memory database.
    /// A single connection keeps every query on the same memory database.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        Self::migrate(&pool).await?;
        Ok(Self { pool: Arc::new(pool) })
    }

    async fn migrate(pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS value_slots (
                slot_key TEXT PRIMARY KEY,
                payload TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            );
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp INTEGER NOT NULL,
                student_id INTEGER,
                student_name TEXT NOT NULL,
                action_type TEXT NOT NULL,
                details TEXT NOT NULL,
                description TEXT
            );
            "#,
        )
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Replace the JSON payload held in slot `key`
    pub async fn put_value(&self, key: &str, payload: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO value_slots (slot_key, payload, updated_at) VALUES (?, ?, ?) \
             ON CONFLICT(slot_key) DO UPDATE SET payload = excluded.payload, updated_at = excluded.updated_at",
        )
        .bind(key)
        .bind(payload)
        .bind(Utc::now().timestamp_millis())
        .execute(&*self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_value(&self, key: &str) -> Result<Option<String>> {
        let payload = sqlx::query_scalar::<_, String>("SELECT payload FROM value_slots WHERE slot_key = ?")
            .bind(key)
            .fetch_optional(&*self.pool)
            .await?;
        Ok(payload)
    }

    /// `false` when the slot was already empty
    pub async fn delete_value(&self, key: &str) -> Result<bool> {
        let removed = sqlx::query("DELETE FROM value_slots WHERE slot_key = ?")
            .bind(key)
            .execute(&*self.pool)
            .await?
            .rows_affected();
        Ok(removed > 0)
    }

    /// Append a history entry and return it with its assigned id
    pub async fn insert_history(&self, entry: &NewHistoryEntry) -> Result<HistoryEntry> {
        let result = sqlx::query(
            "INSERT INTO history (timestamp, student_id, student_name, action_type, details, description) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(entry.timestamp)
        .bind(entry.student_id)
        .bind(&entry.student_name)
        .bind(entry.action_type.as_str())
        .bind(&entry.details)
        .bind(&entry.description)
        .execute(&*self.pool)
        .await?;

        Ok(entry.clone().into_entry(result.last_insert_rowid()))
    }

    /// All history entries, newest first
    pub async fn list_history(&self) -> Result<Vec<HistoryEntry>> {
        let rows = sqlx::query(
            "SELECT id, timestamp, student_id, student_name, action_type, details, description \
             FROM history ORDER BY timestamp DESC, id DESC",
        )
        .fetch_all(&*self.pool)
        .await?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            let action: String = row.get("action_type");
            let details: String = row.get("details");
            let description: Option<String> = row.get("description");
            entries.push(HistoryEntry {
                id: row.get("id"),
                timestamp: row.get("timestamp"),
                student_id: row.get("student_id"),
                student_name: row.get("student_name"),
                action_type: action.parse::<HistoryAction>()?,
                description: description
                    .filter(|d| !d.is_empty())
                    .unwrap_or_else(|| details.clone()),
                details,
            });
        }
        Ok(entries)
    }

    /// Remove every history entry, returning how many were deleted
    pub async fn clear_history(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM history")
            .execute(&*self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
