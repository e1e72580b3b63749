use std::str::FromStr;
use std::time::Duration;

use anyhow::Result;
use indexmap::IndexMap;
use serde_json::Value;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow},
    Column, Row, SqlitePool,
};
use tracing::{info, instrument};

/// One row of a destination table as handed to the page payload.
pub type DisplayRow = IndexMap<String, Value>;

#[derive(Clone)]
pub struct Db {
    pub pool: SqlitePool,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRecord {
    pub id: i64,
    pub username: String,
    pub password: String,
}

impl Db {
    // SECURITY: never include raw DSNs in tracing spans (they may contain credentials).
    #[instrument(skip(database_url))]
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let connect_options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(600))
            .connect_with(connect_options)
            .await?;
        info!(max_connections, "connected to db");
        Ok(Self { pool })
    }

    /// Private in-memory database. A single connection is pinned for the
    /// pool's lifetime; `:memory:` databases vanish with their connection.
    pub async fn in_memory() -> Result<Self> {
        let connect_options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(connect_options)
            .await?;
        Ok(Self { pool })
    }

    pub async fn ping(&self) -> bool {
        sqlx::query_scalar::<_, i64>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .is_ok()
    }

    pub async fn table_exists(&self, table: &str) -> Result<bool, sqlx::Error> {
        let found: Option<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?",
        )
        .bind(table)
        .fetch_optional(&self.pool)
        .await?;
        Ok(found.is_some())
    }

    /// Column names of `table` in definition order (identity column included).
    pub async fn table_columns(&self, table: &str) -> Result<Vec<String>, sqlx::Error> {
        let rows = sqlx::query("SELECT name FROM pragma_table_info(?) ORDER BY cid")
            .bind(table)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(|r| r.try_get::<String, _>(0)).collect()
    }

    /// `SELECT *` over a destination table, decoded column by column.
    pub async fn fetch_table(&self, table: &str) -> Result<Vec<DisplayRow>, sqlx::Error> {
        let sql = format!("SELECT * FROM {}", quote_ident(table));
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        Ok(rows.iter().map(display_row).collect())
    }

    pub async fn count_rows(&self, table: &str) -> Result<i64, sqlx::Error> {
        let sql = format!("SELECT COUNT(*) FROM {}", quote_ident(table));
        sqlx::query_scalar(&sql).fetch_one(&self.pool).await
    }

    /// Empty the table and reset its identity counter.
    pub async fn truncate_table(&self, table: &str) -> Result<u64, sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        let deleted = sqlx::query(&format!("DELETE FROM {}", quote_ident(table)))
            .execute(&mut *tx)
            .await?
            .rows_affected();
        // sqlite_sequence exists as soon as any AUTOINCREMENT table does
        sqlx::query("DELETE FROM sqlite_sequence WHERE name = ?")
            .bind(table)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        info!(table, deleted, "table truncated");
        Ok(deleted)
    }
}

impl Db {
    pub async fn ensure_users_table(&self) -> Result<(), sqlx::Error> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL UNIQUE,
                password TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn find_user(&self, username: &str) -> Result<Option<UserRecord>, sqlx::Error> {
        sqlx::query_as::<_, UserRecord>(
            "SELECT id, username, password FROM users WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
    }

    /// Insert a user, or replace the stored hash when `overwrite` is set.
    /// Returns `true` when a row was written.
    pub async fn upsert_user(
        &self,
        username: &str,
        password_hash: &str,
        overwrite: bool,
    ) -> Result<bool, sqlx::Error> {
        let sql = if overwrite {
            "INSERT INTO users (username, password) VALUES (?, ?)
             ON CONFLICT(username) DO UPDATE SET password = excluded.password"
        } else {
            "INSERT INTO users (username, password) VALUES (?, ?)
             ON CONFLICT(username) DO NOTHING"
        };
        let res = sqlx::query(sql)
            .bind(username)
            .bind(password_hash)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}

/// Quote an SQL identifier, doubling any embedded quote character.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn display_row(row: &SqliteRow) -> DisplayRow {
    row.columns()
        .iter()
        .map(|col| {
            let idx = col.ordinal();
            let value = if let Ok(v) = row.try_get::<Option<String>, _>(idx) {
                v.map(Value::String).unwrap_or(Value::Null)
            } else if let Ok(v) = row.try_get::<Option<i64>, _>(idx) {
                v.map(Value::from).unwrap_or(Value::Null)
            } else if let Ok(v) = row.try_get::<Option<f64>, _>(idx) {
                v.map(Value::from).unwrap_or(Value::Null)
            } else {
                Value::Null
            };
            (col.name().to_string(), value)
        })
        .collect()
}
