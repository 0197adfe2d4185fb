//! SQLite-backed two-tier cache store.
//!
//! The persistent tier is a single `cache_entries` table of opaque blobs.
//! The table may live in a database shared with other application data;
//! the tiered cache only ever clears keys under its own namespace prefix.
//! Connection access is serialized behind a mutex and every statement runs
//! on the blocking thread pool so cache I/O never stalls the async runtime.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::{params, Connection};

use super::store::{CacheEntry, CacheStore, MemoryCacheStore, StoreError};

const CREATE_TABLE_SQL: &str = "CREATE TABLE IF NOT EXISTS cache_entries (
    key TEXT PRIMARY KEY,
    value BLOB NOT NULL
)";

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Backend(err.to_string())
    }
}

/// [`CacheStore`] with an in-process memory tier and a SQLite persistent
/// tier.
pub struct SqliteCacheStore {
    memory: MemoryCacheStore,
    conn: Arc<Mutex<Connection>>,
}

impl SqliteCacheStore {
    /// Open or create the cache database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "busy_timeout", 5000)?;
        Self::from_connection(conn)
    }

    /// Open a private in-memory database. Entries do not survive the
    /// process; useful for tests and ephemeral hosts.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute(CREATE_TABLE_SQL, [])?;
        Ok(Self { memory: MemoryCacheStore::new(), conn: Arc::new(Mutex::new(conn)) })
    }

    async fn with_connection<T, F>(&self, operation: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Connection) -> Result<T, rusqlite::Error> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock();
            operation(&conn).map_err(StoreError::from)
        })
        .await
        .map_err(|e| StoreError::Task(format!("spawn_blocking failed: {e}")))?
    }
}

#[async_trait]
impl CacheStore for SqliteCacheStore {
    fn memory_get(&self, key: &str) -> Option<CacheEntry> {
        self.memory.memory_get(key)
    }

    fn memory_set(&self, key: &str, entry: CacheEntry) {
        self.memory.memory_set(key, entry);
    }

    fn memory_delete(&self, key: &str) {
        self.memory.memory_delete(key);
    }

    fn memory_clear(&self) {
        self.memory.memory_clear();
    }

    async fn disk_get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let key = key.to_owned();
        self.with_connection(move |conn| {
            let result = conn.query_row(
                "SELECT value FROM cache_entries WHERE key = ?1",
                params![key],
                |row| row.get::<_, Vec<u8>>(0),
            );
            match result {
                Ok(value) => Ok(Some(value)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(err) => Err(err),
            }
        })
        .await
    }

    async fn disk_set(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
        let key = key.to_owned();
        self.with_connection(move |conn| {
            conn.execute(
                "INSERT INTO cache_entries (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![key, value],
            )
            .map(|_| ())
        })
        .await
    }

    async fn disk_delete(&self, key: &str) -> Result<(), StoreError> {
        let key = key.to_owned();
        self.with_connection(move |conn| {
            conn.execute("DELETE FROM cache_entries WHERE key = ?1", params![key]).map(|_| ())
        })
        .await
    }

    async fn disk_list_keys(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let prefix = prefix.to_owned();
        self.with_connection(move |conn| {
            // substr comparison instead of LIKE so '_' and '%' in the
            // namespace match literally
            let mut statement = conn.prepare(
                "SELECT key FROM cache_entries
                 WHERE substr(key, 1, length(?1)) = ?1
                 ORDER BY key",
            )?;
            let keys = statement
                .query_map(params![prefix], |row| row.get::<_, String>(0))?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(keys)
        })
        .await
    }
}
