//! Storage layer for parkspot.
//!
//! This module provides the typed parking store over an async key-value
//! [`Backend`]: the single current record and the bounded history list.

mod backend;
pub mod migrations;
pub mod schema;
mod sqlite;

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::error::Result;
use crate::record::ParkingRecord;

pub use backend::{Backend, MemoryBackend, StoreKey};
pub use sqlite::SqliteBackend;

/// Maximum number of records kept in the history list.
pub const HISTORY_LIMIT: usize = 10;

/// Typed access to the persisted parking state.
///
/// Provides:
/// - Read, replace and clear of the current record
/// - A most-recent-first history capped at [`HISTORY_LIMIT`]
#[derive(Debug, Clone)]
pub struct Storage {
    backend: Arc<dyn Backend>,
}

impl Storage {
    /// Wrap a backend.
    #[must_use]
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    /// Open or create an `SQLite`-backed store at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(Arc::new(SqliteBackend::open(path)?)))
    }

    /// Create a store with no durability.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryBackend::new()))
    }

    /// Name of the underlying backend.
    #[must_use]
    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Read the current record.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails or the stored value is corrupt.
    pub async fn current(&self) -> Result<Option<ParkingRecord>> {
        match self.backend.get(StoreKey::Current).await? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// Replace the current record.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCoordinates`](crate::Error::InvalidCoordinates)
    /// for a record without a valid position, or a storage error.
    pub async fn set_current(&self, record: &ParkingRecord) -> Result<()> {
        record.validate()?;
        let json = serde_json::to_string(record)?;
        self.backend.set(StoreKey::Current, json).await?;
        debug!("Stored current record created at {}", record.created_at());
        Ok(())
    }

    /// Clear the current record. Clearing an empty slot succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    pub async fn clear_current(&self) -> Result<()> {
        self.backend.remove(StoreKey::Current).await
    }

    /// Read the history, most recent first.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails or the stored value is corrupt.
    pub async fn history(&self) -> Result<Vec<ParkingRecord>> {
        match self.backend.get(StoreKey::History).await? {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(Vec::new()),
        }
    }

    /// Put a record at the front of the history.
    ///
    /// Returns the number of entries evicted to stay within [`HISTORY_LIMIT`].
    ///
    /// # Errors
    ///
    /// Returns an error if the record is invalid or the backend fails.
    pub async fn push_history(&self, record: ParkingRecord) -> Result<usize> {
        record.validate()?;
        let mut history = self.history().await?;
        history.insert(0, record);

        let evicted = history.len().saturating_sub(HISTORY_LIMIT);
        history.truncate(HISTORY_LIMIT);

        self.backend
            .set(StoreKey::History, serde_json::to_string(&history)?)
            .await?;

        if evicted > 0 {
            info!("Evicted {} oldest history entries", evicted);
        }
        Ok(evicted)
    }

    /// Get storage statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if either key cannot be read.
    pub async fn stats(&self) -> Result<StorageStats> {
        let current = self.current().await?;
        let history = self.history().await?;

        Ok(StorageStats {
            has_current: current.is_some(),
            history_len: history.len(),
            newest_history: history.first().map(ParkingRecord::created_at),
            oldest_history: history.last().map(ParkingRecord::created_at),
        })
    }
}

/// Statistics about the storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageStats {
    /// Whether a current record is stored.
    pub has_current: bool,
    /// Number of history entries.
    pub history_len: usize,
    /// Creation time of the newest history entry.
    pub newest_history: Option<DateTime<Utc>>,
    /// Creation time of the oldest history entry.
    pub oldest_history: Option<DateTime<Utc>>,
}
