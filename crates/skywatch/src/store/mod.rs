//! Persistent key/value storage for skywatch.
//!
//! [`KeyValueStore`] is the narrow, synchronous and fallible interface the
//! cache layer is written against. [`SqliteStore`] implements it on top of a
//! single `SQLite` table.

pub mod migrations;
pub mod schema;

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use crate::error::{Error, Result};

/// A string-keyed store of string values.
///
/// Every method may fail (quota, I/O, corruption); callers decide whether the
/// failure matters. Writes replace the whole value stored under a key.
pub trait KeyValueStore: Send {
    /// Read the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying storage cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying storage cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Delete whatever is stored under `key`. Missing keys are not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying storage cannot be written.
    fn remove(&self, key: &str) -> Result<()>;
}

/// `SQLite`-backed [`KeyValueStore`].
#[derive(Debug)]
pub struct SqliteStore {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Connection,
}

impl SqliteStore {
    /// Open or create a store at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema initialization fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening cache store at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        migrations::initialize_schema(&conn)?;

        info!("Cache store opened at {}", path.display());
        Ok(Self { path, conn })
    }

    /// Create an in-memory store for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        migrations::initialize_schema(&conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn,
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// List every stored key in lexical order.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn keys(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare("SELECT key FROM records ORDER BY key")?;
        let keys = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(keys)
    }

    /// Get store statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn stats(&self) -> Result<StoreStats> {
        let total_records: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM records", [], |row| row.get(0))?;

        let newest: Option<String> = self
            .conn
            .query_row(
                "SELECT updated_at FROM records ORDER BY updated_at DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?;
        let last_write = newest
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|dt| dt.with_timezone(&Utc));

        let db_size_bytes = if self.path.to_string_lossy() == ":memory:" {
            0
        } else {
            std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
        };

        Ok(StoreStats {
            total_records,
            last_write,
            db_size_bytes,
        })
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM records WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            r"
            INSERT INTO records (key, value, updated_at) VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            ",
            params![key, value, Utc::now().to_rfc3339()],
        )?;
        debug!(key, bytes = value.len(), "Stored record");
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let affected = self
            .conn
            .execute("DELETE FROM records WHERE key = ?1", [key])?;
        if affected > 0 {
            debug!(key, "Removed record");
        }
        Ok(())
    }
}

/// Statistics about the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreStats {
    /// Total number of records stored.
    pub total_records: i64,
    /// When any record was last written.
    pub last_write: Option<DateTime<Utc>>,
    /// Size of the database file in bytes.
    pub db_size_bytes: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_store() -> SqliteStore {
        SqliteStore::open_in_memory().expect("failed to create test store")
    }

    #[test]
    fn test_open_in_memory() {
        let store = SqliteStore::open_in_memory();
        assert!(store.is_ok());
    }

    #[test]
    fn test_set_and_get() {
        let store = create_test_store();
        store.set("FLIGHT_DATA", "{\"x\":1}").unwrap();

        assert_eq!(
            store.get("FLIGHT_DATA").unwrap().as_deref(),
            Some("{\"x\":1}")
        );
    }

    #[test]
    fn test_get_missing() {
        let store = create_test_store();
        assert!(store.get("nope").unwrap().is_none());
    }

    #[test]
    fn test_set_overwrites() {
        let store = create_test_store();
        store.set("k", "one").unwrap();
        store.set("k", "two").unwrap();

        assert_eq!(store.get("k").unwrap().as_deref(), Some("two"));
        assert_eq!(store.stats().unwrap().total_records, 1);
    }

    #[test]
    fn test_remove() {
        let store = create_test_store();
        store.set("k", "v").unwrap();
        store.remove("k").unwrap();
        assert!(store.get("k").unwrap().is_none());

        // Removing again is fine
        store.remove("k").unwrap();
    }

    #[test]
    fn test_keys_sorted() {
        let store = create_test_store();
        store.set("b", "2").unwrap();
        store.set("a", "1").unwrap();

        assert_eq!(store.keys().unwrap(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_stats_empty() {
        let store = create_test_store();
        let stats = store.stats().unwrap();

        assert_eq!(stats.total_records, 0);
        assert!(stats.last_write.is_none());
        assert_eq!(stats.db_size_bytes, 0);
    }

    #[test]
    fn test_stats_with_data() {
        let store = create_test_store();
        store.set("a", "1").unwrap();
        store.set("b", "2").unwrap();

        let stats = store.stats().unwrap();
        assert_eq!(stats.total_records, 2);
        assert!(stats.last_write.is_some());
    }

    #[test]
    fn test_path() {
        let store = create_test_store();
        assert_eq!(store.path().to_string_lossy(), ":memory:");
    }

    #[test]
    fn test_open_file_based_persists() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let db_path = temp_dir.path().join("cache.db");

        {
            let store = SqliteStore::open(&db_path).unwrap();
            store.set("MAP_VIEW_STATE", "{}").unwrap();
            assert_eq!(store.path(), db_path);
            assert!(store.stats().unwrap().db_size_bytes > 0);
        }

        let reopened = SqliteStore::open(&db_path).unwrap();
        assert_eq!(reopened.get("MAP_VIEW_STATE").unwrap().as_deref(), Some("{}"));
    }

    #[test]
    fn test_open_creates_parent_dirs() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let nested_path = temp_dir.path().join("nested/deeper/cache.db");

        let _store = SqliteStore::open(&nested_path).unwrap();
        assert!(nested_path.exists());
    }

    #[test]
    fn test_unicode_value() {
        let store = create_test_store();
        store.set("USER_PREFERENCES", "{\"country\":\"España\"}").unwrap();
        assert_eq!(
            store.get("USER_PREFERENCES").unwrap().as_deref(),
            Some("{\"country\":\"España\"}")
        );
    }
}
