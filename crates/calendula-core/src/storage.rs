//! Local key-value storage.
//!
//! Values are plain strings keyed by a fixed name (`calendar-reminders`,
//! `calendar-theme`). The on-disk backend is a single SQLite table; an
//! in-memory backend is provided for tests and previews.
//!
//! Writes are usually not issued directly: services stage them in a
//! [`DeferredWriter`], which the event loop flushes once per tick.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{RusqliteErrorExt, StorageError};

/// Storage key for the serialized reminder collection.
pub const REMINDERS_KEY: &str = "calendar-reminders";

/// Storage key for the theme preference.
pub const THEME_KEY: &str = "calendar-theme";

/// String-valued key-value persistence.
pub trait KeyValueStore: Send + Sync {
    /// Read a value; `Ok(None)` when the key has never been written.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write (or overwrite) a value.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// SQLite-backed key-value store.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) a store at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let conn = Connection::open(path).map_err(RusqliteErrorExt::into_storage_error)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory SQLite store.
    pub fn in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory().map_err(RusqliteErrorExt::into_storage_error)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<(), StorageError> {
        self.conn
            .lock()
            .execute_batch(
                r#"
                CREATE TABLE IF NOT EXISTS kv (
                    key TEXT PRIMARY KEY,
                    value TEXT NOT NULL,
                    updated_at INTEGER NOT NULL
                );
                "#,
            )
            .map_err(RusqliteErrorExt::into_storage_error)
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.conn
            .lock()
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()
            .map_err(RusqliteErrorExt::into_storage_error)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or_default();

        self.conn
            .lock()
            .execute(
                "INSERT OR REPLACE INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)",
                params![key, value, now],
            )
            .map_err(RusqliteErrorExt::into_storage_error)?;
        Ok(())
    }
}

/// HashMap-backed store. Nothing survives the process.
#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently held.
    pub fn len(&self) -> usize {
        self.values.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.lock().is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.values.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.values.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Write-behind buffer in front of a [`KeyValueStore`].
///
/// `stage` records the latest value per key; `flush` writes every staged
/// value once. Several stages of the same key between two flushes produce a
/// single write carrying the last value.
#[derive(Clone)]
pub struct DeferredWriter {
    store: Arc<dyn KeyValueStore>,
    pending: Arc<Mutex<BTreeMap<String, String>>>,
}

impl DeferredWriter {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            pending: Arc::new(Mutex::new(BTreeMap::new())),
        }
    }

    /// The store this writer flushes into.
    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    /// Queue a value for the next flush, replacing any value already queued for `key`.
    pub fn stage(&self, key: &str, value: String) {
        tracing::trace!("Staged write for {}", key);
        self.pending.lock().insert(key.to_string(), value);
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.lock().is_empty()
    }

    /// Write all staged values. Returns how many keys were written.
    ///
    /// Values that fail to write stay queued for the next flush.
    pub fn flush(&self) -> Result<usize, StorageError> {
        let batch = std::mem::take(&mut *self.pending.lock());
        let mut written = 0;
        let mut first_error = None;

        for (key, value) in batch {
            match self.store.set(&key, &value) {
                Ok(()) => written += 1,
                Err(e) => {
                    tracing::warn!("Failed to persist {}: {}", key, e);
                    // Newer stages made while flushing win over the failed value.
                    self.pending.lock().entry(key).or_insert(value);
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }

        if written > 0 {
            tracing::debug!("Flushed {} staged write(s)", written);
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(written),
        }
    }
}
