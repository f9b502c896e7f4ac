//! SQLite-backed durable store.
//!
//! Values are kept as JSON text in a single `kv_store` table. All access is
//! serialized through a `Mutex<Connection>`; every statement is
//! sub-millisecond, so the blocking calls run inline in the async methods.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;

use super::DurableStore;
use crate::error::StoreError;

struct Migration {
    version: u32,
    description: &'static str,
    sql: &'static str,
}

/// All migrations in order. Each is applied at most once.
const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    description: "create_kv_store_table",
    sql: "CREATE TABLE IF NOT EXISTS kv_store (
            key TEXT PRIMARY KEY NOT NULL,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );",
}];

fn run_migrations(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS _migrations (
            version INTEGER PRIMARY KEY,
            description TEXT NOT NULL,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )?;

    let current_version: u32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM _migrations",
        [],
        |r| r.get(0),
    )?;

    for migration in MIGRATIONS {
        if migration.version <= current_version {
            continue;
        }

        log::info!(
            "Running migration v{}: {}",
            migration.version,
            migration.description
        );

        conn.execute_batch(migration.sql)
            .map_err(|e| StoreError::Migration {
                version: migration.version,
                reason: e.to_string(),
            })?;

        conn.execute(
            "INSERT INTO _migrations (version, description) VALUES (?1, ?2)",
            params![migration.version, migration.description],
        )?;
    }

    Ok(())
}

/// Durable store persisted in a SQLite database file.
///
/// Cloning is cheap (inner `Arc`).
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Opens (or creates) the database at `path` and runs pending migrations.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        run_migrations(&conn)?;

        log::info!("Checkpoint database opened at {}", path.display());

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Opens an in-memory database. Contents are lost when dropped.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        run_migrations(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn with_conn<F, T>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Connection) -> Result<T, StoreError>,
    {
        let conn = self.conn.lock().map_err(|_| StoreError::LockPoisoned)?;
        f(&conn)
    }
}

#[async_trait]
impl DurableStore for SqliteStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let raw: Option<String> = self.with_conn(|conn| {
            Ok(conn
                .query_row(
                    "SELECT value FROM kv_store WHERE key = ?1",
                    params![key],
                    |r| r.get(0),
                )
                .optional()?)
        })?;

        raw.map(|text| {
            serde_json::from_str(&text).map_err(|e| StoreError::Serialization {
                key: key.to_string(),
                source: e,
            })
        })
        .transpose()
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        let text = serde_json::to_string(&value).map_err(|e| StoreError::Serialization {
            key: key.to_string(),
            source: e,
        })?;
        let now = Utc::now().to_rfc3339();

        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO kv_store (key, value, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                params![key, text, now],
            )?;
            Ok(())
        })
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM kv_store WHERE key = ?1", params![key])?;
            Ok(())
        })
    }
}

/// Returns the canonical database path: `~/.cvpdf/data/cvpdf.db`.
pub fn default_database_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".cvpdf").join("data").join("cvpdf.db"))
}
