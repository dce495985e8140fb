//! Key-value backends.
//!
//! A [`Backend`] stores opaque string values under the two [`StoreKey`]s.
//! Writes are atomic per key: a reader sees either the old value or the new
//! one, never a partial write.

use std::collections::HashMap;
use std::fmt;

use tokio::sync::RwLock;

use crate::error::Result;

/// The logical keys of the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKey {
    /// The single active parking record.
    Current,
    /// The bounded list of past records.
    History,
}

impl StoreKey {
    /// The key as written to the backend.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Current => "current",
            Self::History => "history",
        }
    }
}

impl fmt::Display for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trait for async key-value storage media.
#[async_trait::async_trait]
pub trait Backend: Send + Sync + fmt::Debug {
    /// The name of this backend (for logging/debugging).
    fn name(&self) -> &'static str;

    /// Read the value under `key`, or `None` if absent.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the medium cannot be read.
    async fn get(&self, key: StoreKey) -> Result<Option<String>>;

    /// Write `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the medium is full, disabled or
    /// unavailable.
    async fn set(&self, key: StoreKey, value: String) -> Result<()>;

    /// Remove the value under `key`. Removing an absent key succeeds.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the medium cannot be written.
    async fn remove(&self, key: StoreKey) -> Result<()>;
}

/// A process-local backend with no durability.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    values: RwLock<HashMap<StoreKey, String>>,
}

impl MemoryBackend {
    /// Create an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl Backend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: StoreKey) -> Result<Option<String>> {
        Ok(self.values.read().await.get(&key).cloned())
    }

    async fn set(&self, key: StoreKey, value: String) -> Result<()> {
        self.values.write().await.insert(key, value);
        Ok(())
    }

    async fn remove(&self, key: StoreKey) -> Result<()> {
        self.values.write().await.remove(&key);
        Ok(())
    }
}
