//! `parkspot` - Remember where you parked
//!
//! This library keeps a single current parking record (position, optional
//! photo, memo, floor and zone tags) with a short history of earlier spots,
//! a confirmation notification on save and an optional one-shot reminder.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod cli;
pub mod config;
pub mod error;
pub mod geo;
pub mod location;
pub mod logging;
pub mod manager;
pub mod notify;
pub mod photo;
pub mod record;
pub mod storage;

#[cfg(test)]
mod testing;

pub use config::Config;
pub use error::{Error, Result};
pub use geo::Position;
pub use location::{GeoLocator, LocateOptions, LocationError, PositionSource};
pub use logging::init_logging;
pub use manager::{ManagerOptions, ParkingManager, ParkingState};
pub use notify::{NotificationScheduler, Notifier, Permission, ScheduleHandle};
pub use photo::{ImageCompressor, Photo};
pub use record::{ParkingDraft, ParkingRecord, ReminderInterval, UnsavedRecord};
pub use storage::{Storage, StorageStats};
