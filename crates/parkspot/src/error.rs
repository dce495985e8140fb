//! Error types for parkspot.
//!
//! This module defines all error types used throughout the parkspot crate,
//! providing detailed context for debugging and user-friendly error messages.

use std::path::PathBuf;
use thiserror::Error;

use crate::location::LocationError;
use crate::record::{ParkingRecord, UnsavedRecord};

/// The main error type for parkspot operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Location Errors ===
    /// The position query failed.
    #[error("location error: {0}")]
    Location(#[from] LocationError),

    /// Coordinates are missing, non-finite or out of range.
    #[error("invalid coordinates ({latitude}, {longitude})")]
    InvalidCoordinates {
        /// Latitude in degrees.
        latitude: f64,
        /// Longitude in degrees.
        longitude: f64,
    },

    // === Record Errors ===
    /// The reminder delay is not one of the allowed intervals.
    #[error("invalid reminder: {minutes} minutes is not an allowed interval")]
    InvalidReminder {
        /// The rejected number of minutes.
        minutes: u32,
    },

    // === Photo Errors ===
    /// The supplied bytes are not a readable image.
    #[error("failed to decode photo: {0}")]
    ImageDecode(#[source] image::ImageError),

    /// Re-encoding the photo failed.
    #[error("failed to encode photo: {0}")]
    ImageEncode(#[source] image::ImageError),

    /// A stored photo payload is not valid base64.
    #[error("invalid photo payload: {0}")]
    PhotoPayload(#[from] base64::DecodeError),

    /// Compression settings are out of range.
    #[error("invalid compression settings: {message}")]
    InvalidCompression {
        /// Description of the invalid setting.
        message: String,
    },

    // === Storage Errors ===
    /// Failed to open or create the database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    /// The storage medium is full, disabled or otherwise unavailable.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    /// A save acquired a position but could not write the record.
    ///
    /// The assembled record travels with the error so the caller can retry
    /// the write without asking for a new fix.
    #[error("parking record was not saved: {source}")]
    NotPersisted {
        /// The record that failed to persist.
        record: Box<UnsavedRecord>,
        /// The storage failure.
        #[source]
        source: Box<Error>,
    },

    // === Notification Errors ===
    /// The platform cannot display notifications.
    #[error("notifications are not supported on this platform")]
    NotificationUnsupported,

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Generic Errors ===
    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for parkspot operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Create a new storage-unavailable error.
    #[must_use]
    pub fn storage_unavailable(message: impl Into<String>) -> Self {
        Self::StorageUnavailable(message.into())
    }

    /// Check if this error comes from the persistence layer.
    #[must_use]
    pub fn is_storage_error(&self) -> bool {
        match self {
            Self::DatabaseOpen { .. }
            | Self::DatabaseQuery(_)
            | Self::DatabaseMigration { .. }
            | Self::DirectoryCreate { .. }
            | Self::StorageUnavailable(_) => true,
            Self::NotPersisted { source, .. } => source.is_storage_error(),
            _ => false,
        }
    }

    /// Check if this error is a location failure.
    #[must_use]
    pub fn is_location_error(&self) -> bool {
        matches!(self, Self::Location(_))
    }

    /// The record that was assembled but not persisted, if any.
    #[must_use]
    pub fn unsaved_record(&self) -> Option<&ParkingRecord> {
        match self {
            Self::NotPersisted { record, .. } => Some(record.record()),
            _ => None,
        }
    }

    /// Take the unsaved record out of the error, for
    /// [`ParkingManager::commit`](crate::ParkingManager::commit).
    #[must_use]
    pub fn into_unsaved(self) -> Option<UnsavedRecord> {
        match self {
            Self::NotPersisted { record, .. } => Some(*record),
            _ => None,
        }
    }

    /// A message suitable for showing to the person using the app.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Location(LocationError::PermissionDenied) => {
                "Location permission was denied. Allow location access and try again.".to_string()
            }
            Self::Location(LocationError::PositionUnavailable) => {
                "Your position is not available right now. Move to open sky and try again."
                    .to_string()
            }
            Self::Location(LocationError::Timeout) => {
                "Finding your position took too long. Please try again.".to_string()
            }
            Self::Location(LocationError::LocationUnavailable(_)) => {
                "Could not get your location.".to_string()
            }
            Self::InvalidCoordinates { .. } => {
                "The position reported for this spot is not valid.".to_string()
            }
            Self::InvalidReminder { .. } => {
                "Choose a reminder of 30 minutes, or 1, 2, 3 or 4 hours.".to_string()
            }
            Self::ImageDecode(_) | Self::ImageEncode(_) | Self::PhotoPayload(_) => {
                "The photo could not be processed. Try another photo.".to_string()
            }
            Self::NotPersisted { .. } => {
                "Your parking location could not be saved. Please try again.".to_string()
            }
            err if err.is_storage_error() => {
                "Saved parking data could not be accessed. Please try again.".to_string()
            }
            _ => "Something went wrong. Please try again.".to_string(),
        }
    }
}
