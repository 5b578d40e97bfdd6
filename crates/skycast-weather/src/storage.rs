//! Persistent key-value storage for saved locations and cached snapshots.
//!
//! Values are JSON documents. `SqliteStore` keeps them in a single `kv` table;
//! `MemoryStore` is an in-process map for tests and ephemeral sessions.

use anyhow::Context;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use skycast_core::RusqliteErrorExt;
use std::collections::HashMap;
use std::path::Path;

use crate::types::{StorageError, StorageResult};

/// Key holding the saved-locations list
pub const SAVED_LOCATIONS_KEY: &str = "saved_locations";

/// Key holding the most recently displayed snapshot
pub const LAST_VIEWED_KEY: &str = "last_viewed";

/// Key holding the cached snapshot for a location
pub fn weather_key(location_id: &str) -> String {
    format!("weather:{}", location_id)
}

/// Trait for key-value storage backends.
///
/// Implementations must be shareable across tasks; callers hold them as
/// `Arc<dyn KvStore>`.
pub trait KvStore: Send + Sync {
    /// Get the raw value for a key. Returns `None` if the key is absent.
    fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Insert or overwrite a value.
    fn set(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Remove a key. Absent keys are not an error.
    fn delete(&self, key: &str) -> StorageResult<()>;
}

/// Read and deserialize a JSON value. Unparseable data is `StorageError::Corruption`.
pub fn read_json<T: DeserializeOwned>(store: &dyn KvStore, key: &str) -> StorageResult<Option<T>> {
    match store.get(key)? {
        Some(raw) => serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| StorageError::Corruption(format!("{}: {}", key, e))),
        None => Ok(None),
    }
}

/// Serialize and store a JSON value.
pub fn write_json<T: Serialize + ?Sized>(store: &dyn KvStore, key: &str, value: &T) -> StorageResult<()> {
    let raw = serde_json::to_string(value)
        .map_err(|e| StorageError::WriteFailed(format!("{}: {}", key, e)))?;
    store.set(key, &raw)
}

/// SQLite-backed store.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create data directory")?;
        }
        let conn = Connection::open(path)
            .map_err(|e| e.into_storage_error())
            .with_context(|| format!("Failed to open database at {}", path.display()))?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory store.
    pub fn in_memory() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> anyhow::Result<()> {
        self.conn
            .lock()
            .execute_batch(
                r#"
                CREATE TABLE IF NOT EXISTS kv (
                    key TEXT PRIMARY KEY,
                    value TEXT NOT NULL
                );
                "#,
            )
            .map_err(|e| e.into_storage_error())
            .context("Failed to initialize kv schema")?;
        Ok(())
    }
}

impl KvStore for SqliteStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        self.conn
            .lock()
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| row.get(0))
            .optional()
            .map_err(|e| e.into_storage_error())
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        self.conn
            .lock()
            .execute(
                "INSERT INTO kv (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![key, value],
            )
            .map(|_| ())
            .map_err(|e| StorageError::WriteFailed(e.to_string()))
    }

    fn delete(&self, key: &str) -> StorageResult<()> {
        self.conn
            .lock()
            .execute("DELETE FROM kv WHERE key = ?1", params![key])
            .map(|_| ())
            .map_err(|e| StorageError::WriteFailed(e.to_string()))
    }
}

/// In-process store.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        self.entries.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> StorageResult<()> {
        self.entries.lock().remove(key);
        Ok(())
    }
}
