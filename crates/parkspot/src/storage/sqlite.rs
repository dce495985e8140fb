//! `SQLite` backend.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use crate::error::{Error, Result};

use super::backend::{Backend, StoreKey};
use super::migrations;
use super::schema::{DELETE_VALUE, SELECT_VALUE, UPSERT_VALUE};

/// Durable backend on a single `SQLite` database.
///
/// The connection lives behind a mutex and every statement runs on the
/// blocking thread pool.
#[derive(Debug, Clone)]
pub struct SqliteBackend {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Arc<Mutex<Connection>>,
}

impl SqliteBackend {
    /// Open or create a database at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist.
    /// Initializes the schema if this is a new database.
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

        debug!("Opening database at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        migrations::initialize_schema(&conn)?;

        info!("Database opened successfully at {}", path.display());
        Ok(Self {
            path,
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Create an in-memory database, mostly for testing.
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
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Size of the database file in bytes (0 for in-memory databases).
    #[must_use]
    pub fn size_bytes(&self) -> u64 {
        if self.path.as_os_str() == ":memory:" {
            0
        } else {
            std::fs::metadata(&self.path).map_or(0, |m| m.len())
        }
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| Error::storage_unavailable("database connection lock poisoned"))?;
            let conn: &Connection = &guard;
            f(conn)
        })
        .await
        .map_err(|e| Error::storage_unavailable(format!("storage task failed: {e}")))?
    }
}

#[async_trait::async_trait]
impl Backend for SqliteBackend {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    async fn get(&self, key: StoreKey) -> Result<Option<String>> {
        self.with_conn(move |conn| {
            let value: Option<String> = conn
                .query_row(SELECT_VALUE, [key.as_str()], |row| row.get(0))
                .optional()?;
            Ok(value)
        })
        .await
    }

    async fn set(&self, key: StoreKey, value: String) -> Result<()> {
        self.with_conn(move |conn| {
            conn.execute(
                UPSERT_VALUE,
                params![key.as_str(), value, Utc::now().to_rfc3339()],
            )?;
            debug!("Wrote key {}", key);
            Ok(())
        })
        .await
    }

    async fn remove(&self, key: StoreKey) -> Result<()> {
        self.with_conn(move |conn| {
            let affected = conn.execute(DELETE_VALUE, [key.as_str()])?;
            debug!("Removed key {} ({} rows)", key, affected);
            Ok(())
        })
        .await
    }
}
