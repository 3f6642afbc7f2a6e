//! SQLite-backed [`KvBackend`] for devices where a single database file is
//! preferred over a directory of JSON documents.

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

use campcook_local_store::{KvBackend, StoreError};

const SCHEMA: &str = "\
CREATE TABLE IF NOT EXISTS documents (
    key        TEXT PRIMARY KEY,
    body       BLOB NOT NULL,
    updated_at TEXT NOT NULL
);";

/// Thread-safe: wraps the connection in a Mutex so it can be shared via
/// `Arc<SqliteBackend>`.
pub struct SqliteBackend {
    conn: Mutex<Connection>,
    /// Directory holding the database file; other processes open it too.
    lock_dir: Option<PathBuf>,
}

impl SqliteBackend {
    /// Open (or create) the database at `path`.
    pub fn open_path(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::io(parent.display(), e))?;
        }
        let conn = Connection::open(path).map_err(StoreError::backend)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")
            .map_err(StoreError::backend)?;
        conn.execute_batch("PRAGMA synchronous=FULL;")
            .map_err(StoreError::backend)?;
        let lock_dir = path
            .parent()
            .map(|dir| if dir.as_os_str().is_empty() { Path::new(".") } else { dir })
            .map(Path::to_path_buf);
        Self::init(conn, lock_dir)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory().map_err(StoreError::backend)?, None)
    }

    fn init(conn: Connection, lock_dir: Option<PathBuf>) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA).map_err(StoreError::backend)?;
        Ok(Self {
            conn: Mutex::new(conn),
            lock_dir,
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl KvBackend for SqliteBackend {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        self.conn()
            .query_row(
                "SELECT body FROM documents WHERE key = ?1",
                params![key],
                |row| row.get::<_, Vec<u8>>(0),
            )
            .optional()
            .map_err(StoreError::backend)
    }

    fn write(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        self.conn()
            .execute(
                "INSERT INTO documents (key, body, updated_at) VALUES (?1, ?2, ?3) \
                 ON CONFLICT(key) DO UPDATE SET body = excluded.body, updated_at = excluded.updated_at",
                params![key, value, Utc::now().to_rfc3339()],
            )
            .map_err(StoreError::backend)?;
        debug!(key, bytes = value.len(), "wrote document");
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool, StoreError> {
        let removed = self
            .conn()
            .execute("DELETE FROM documents WHERE key = ?1", params![key])
            .map_err(StoreError::backend)?;
        Ok(removed > 0)
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare("SELECT key FROM documents ORDER BY key")
            .map_err(StoreError::backend)?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(StoreError::backend)?;
        let keys = rows
            .collect::<Result<Vec<_>, _>>()
            .map_err(StoreError::backend)?;
        Ok(keys)
    }

    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn lock_dir(&self) -> Option<&Path> {
        self.lock_dir.as_deref()
    }
}
