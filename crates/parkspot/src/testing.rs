//! Test doubles shared by the unit tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::error::{Error, Result};
use crate::geo::Position;
use crate::location::{LocateOptions, LocationError, PositionSource};
use crate::notify::{Notification, Notifier, Permission};
use crate::storage::{Backend, MemoryBackend, StoreKey};

/// A source that never answers.
#[derive(Debug)]
pub struct PendingSource;

#[async_trait::async_trait]
impl PositionSource for PendingSource {
    fn name(&self) -> &'static str {
        "pending"
    }

    async fn current_position(
        &self,
        _options: &LocateOptions,
    ) -> std::result::Result<Position, LocationError> {
        std::future::pending().await
    }
}

/// A source that always fails with the given error.
#[derive(Debug)]
pub struct FailingSource(pub LocationError);

#[async_trait::async_trait]
impl PositionSource for FailingSource {
    fn name(&self) -> &'static str {
        "failing"
    }

    async fn current_position(
        &self,
        _options: &LocateOptions,
    ) -> std::result::Result<Position, LocationError> {
        Err(self.0.clone())
    }
}

/// A fixed source that counts how often it was queried.
#[derive(Debug)]
pub struct CountingSource {
    position: Position,
    calls: AtomicUsize,
}

impl CountingSource {
    pub fn new(position: Position) -> Self {
        Self {
            position,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl PositionSource for CountingSource {
    fn name(&self) -> &'static str {
        "counting"
    }

    async fn current_position(
        &self,
        _options: &LocateOptions,
    ) -> std::result::Result<Position, LocationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.position)
    }
}

/// A notifier that remembers what it showed.
#[derive(Debug)]
pub struct RecordingNotifier {
    permission: Permission,
    requests: AtomicUsize,
    shown: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn new(permission: Permission) -> Self {
        Self {
            permission,
            requests: AtomicUsize::new(0),
            shown: Mutex::new(Vec::new()),
        }
    }

    pub fn permission_requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    pub fn shown(&self) -> Vec<Notification> {
        self.shown.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Notifier for RecordingNotifier {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn request_permission(&self) -> Permission {
        self.requests.fetch_add(1, Ordering::SeqCst);
        self.permission
    }

    async fn show(&self, notification: &Notification) -> Result<()> {
        self.shown.lock().unwrap().push(notification.clone());
        Ok(())
    }
}

/// An in-memory backend whose reads and writes can be switched off.
#[derive(Debug, Default)]
pub struct FlakyBackend {
    inner: MemoryBackend,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl FlakyBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    fn check(flag: &AtomicBool) -> Result<()> {
        if flag.load(Ordering::SeqCst) {
            Err(Error::storage_unavailable("quota exceeded"))
        } else {
            Ok(())
        }
    }
}

#[async_trait::async_trait]
impl Backend for FlakyBackend {
    fn name(&self) -> &'static str {
        "flaky"
    }

    async fn get(&self, key: StoreKey) -> Result<Option<String>> {
        Self::check(&self.fail_reads)?;
        self.inner.get(key).await
    }

    async fn set(&self, key: StoreKey, value: String) -> Result<()> {
        Self::check(&self.fail_writes)?;
        self.inner.set(key, value).await
    }

    async fn remove(&self, key: StoreKey) -> Result<()> {
        Self::check(&self.fail_writes)?;
        self.inner.remove(key).await
    }
}
