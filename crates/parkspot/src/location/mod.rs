//! One-shot position acquisition.
//!
//! This module defines the platform seam for position queries
//! ([`PositionSource`]) and the [`GeoLocator`] that turns a source into a
//! deadline-bounded async operation with typed failures.

mod sources;

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::config::LocationConfig;
use crate::geo::{validate_coordinates, Position};

pub use sources::{FixedPosition, NoGeolocation};

/// Errors that can occur while acquiring a position.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocationError {
    /// The user or platform refused access to location.
    #[error("location permission denied")]
    PermissionDenied,

    /// The platform could not produce a fix.
    #[error("position unavailable")]
    PositionUnavailable,

    /// No fix arrived before the deadline.
    #[error("location request timed out")]
    Timeout,

    /// Any other platform failure.
    #[error("location unavailable: {0}")]
    LocationUnavailable(String),
}

impl LocationError {
    /// Create a generic location failure.
    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::LocationUnavailable(message.into())
    }
}

/// Options for a single position query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocateOptions {
    /// Ask the platform for its most accurate fix.
    pub high_accuracy: bool,
    /// Upper bound on how long the query may take.
    pub timeout: Duration,
    /// Accept a previous fix no older than this. Zero always queries.
    pub max_cache_age: Duration,
}

impl Default for LocateOptions {
    fn default() -> Self {
        Self {
            high_accuracy: true,
            timeout: Duration::from_secs(10),
            max_cache_age: Duration::ZERO,
        }
    }
}

impl From<&LocationConfig> for LocateOptions {
    fn from(config: &LocationConfig) -> Self {
        Self {
            high_accuracy: config.high_accuracy,
            timeout: Duration::from_millis(config.timeout_ms),
            max_cache_age: Duration::from_millis(config.max_cache_age_ms),
        }
    }
}

/// Trait for platform-specific position providers.
///
/// Implementors wrap whatever the host offers (a GPS daemon, a browser
/// bridge, a phone companion app) and map its failures onto
/// [`LocationError`]. Sources need not enforce the deadline themselves;
/// [`GeoLocator`] does.
#[async_trait::async_trait]
pub trait PositionSource: Send + Sync + std::fmt::Debug {
    /// The name of this source (for logging/debugging).
    fn name(&self) -> &'static str;

    /// Produce a single position fix.
    ///
    /// # Errors
    ///
    /// Returns the [`LocationError`] matching the platform failure.
    async fn current_position(
        &self,
        options: &LocateOptions,
    ) -> std::result::Result<Position, LocationError>;
}

/// Deadline-bounded position queries over a [`PositionSource`].
#[derive(Debug)]
pub struct GeoLocator {
    source: Arc<dyn PositionSource>,
    last_fix: Mutex<Option<(Instant, Position)>>,
}

impl GeoLocator {
    /// Create a locator over the given source.
    #[must_use]
    pub fn new(source: Arc<dyn PositionSource>) -> Self {
        Self {
            source,
            last_fix: Mutex::new(None),
        }
    }

    /// Name of the underlying source.
    #[must_use]
    pub fn source_name(&self) -> &'static str {
        self.source.name()
    }

    /// Acquire one position fix.
    ///
    /// Returns a cached fix when `max_cache_age` allows it. Otherwise the
    /// source is queried and abandoned once `timeout` elapses.
    ///
    /// # Errors
    ///
    /// Returns [`LocationError::Timeout`] when the deadline passes, the
    /// source's own error when it fails, and
    /// [`LocationError::PositionUnavailable`] when the fix has invalid
    /// coordinates.
    pub async fn locate(
        &self,
        options: &LocateOptions,
    ) -> std::result::Result<Position, LocationError> {
        if let Some(cached) = self.cached_fix(options.max_cache_age).await {
            debug!("Reusing cached position fix from {}", self.source.name());
            return Ok(cached);
        }

        debug!(
            "Requesting position from {} (high accuracy: {}, timeout: {:?})",
            self.source.name(),
            options.high_accuracy,
            options.timeout
        );

        let position =
            match tokio::time::timeout(options.timeout, self.source.current_position(options))
                .await
            {
                Ok(Ok(position)) => position,
                Ok(Err(err)) => {
                    warn!("Position query failed: {}", err);
                    return Err(err);
                }
                Err(_) => {
                    warn!("Position query timed out after {:?}", options.timeout);
                    return Err(LocationError::Timeout);
                }
            };

        if validate_coordinates(position.latitude, position.longitude).is_err() {
            warn!(
                "Discarding fix with invalid coordinates ({}, {})",
                position.latitude, position.longitude
            );
            return Err(LocationError::PositionUnavailable);
        }

        *self.last_fix.lock().await = Some((Instant::now(), position));
        Ok(position)
    }

    async fn cached_fix(&self, max_age: Duration) -> Option<Position> {
        if max_age.is_zero() {
            return None;
        }
        let guard = self.last_fix.lock().await;
        guard
            .as_ref()
            .filter(|(taken_at, _)| taken_at.elapsed() <= max_age)
            .map(|(_, position)| *position)
    }
}
