//! Parking record types.
//!
//! This module defines the persisted [`ParkingRecord`], the caller-held
//! [`ParkingDraft`] it is assembled from, and the allowed reminder delays.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Error, Result};
use crate::geo::{self, Position};
use crate::photo::Photo;

/// Allowed reminder delays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum ReminderInterval {
    /// 30 minutes.
    HalfHour,
    /// 1 hour.
    OneHour,
    /// 2 hours.
    TwoHours,
    /// 3 hours.
    ThreeHours,
    /// 4 hours.
    FourHours,
}

impl ReminderInterval {
    /// Every allowed interval, shortest first.
    pub const ALL: [Self; 5] = [
        Self::HalfHour,
        Self::OneHour,
        Self::TwoHours,
        Self::ThreeHours,
        Self::FourHours,
    ];

    /// The interval length in minutes.
    #[must_use]
    pub fn minutes(self) -> u32 {
        match self {
            Self::HalfHour => 30,
            Self::OneHour => 60,
            Self::TwoHours => 120,
            Self::ThreeHours => 180,
            Self::FourHours => 240,
        }
    }

    /// The interval as a [`Duration`].
    #[must_use]
    pub fn as_duration(self) -> Duration {
        Duration::from_secs(u64::from(self.minutes()) * 60)
    }

    /// Parse a minute count, where zero means "no reminder".
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidReminder`] for any other value outside the
    /// allowed set.
    pub fn from_minutes(minutes: u32) -> Result<Option<Self>> {
        if minutes == 0 {
            return Ok(None);
        }
        Self::ALL
            .into_iter()
            .find(|interval| interval.minutes() == minutes)
            .map(Some)
            .ok_or(Error::InvalidReminder { minutes })
    }
}

impl TryFrom<u32> for ReminderInterval {
    type Error = Error;

    fn try_from(minutes: u32) -> Result<Self> {
        Self::from_minutes(minutes)?.ok_or(Error::InvalidReminder { minutes })
    }
}

impl From<ReminderInterval> for u32 {
    fn from(interval: ReminderInterval) -> Self {
        interval.minutes()
    }
}

impl fmt::Display for ReminderInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.minutes() {
            m if m < 60 => write!(f, "{m} minutes"),
            60 => write!(f, "1 hour"),
            m => write!(f, "{} hours", m / 60),
        }
    }
}

/// Input collected by the caller before a save.
///
/// The draft is borrowed by the manager, so it survives a failed save and
/// can be retried as-is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParkingDraft {
    /// Raw photo bytes in any decodable format.
    pub photo: Option<Vec<u8>>,
    /// Free-text note.
    pub memo: Option<String>,
    /// Floor tag, e.g. "B2".
    pub floor: Option<String>,
    /// Zone tag, e.g. "C-14".
    pub zone: Option<String>,
    /// Optional reminder.
    pub reminder: Option<ReminderInterval>,
}

impl ParkingDraft {
    /// An empty draft.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the memo.
    #[must_use]
    pub fn with_memo(mut self, memo: impl Into<String>) -> Self {
        self.memo = Some(memo.into());
        self
    }

    /// Set the floor tag.
    #[must_use]
    pub fn with_floor(mut self, floor: impl Into<String>) -> Self {
        self.floor = Some(floor.into());
        self
    }

    /// Set the zone tag.
    #[must_use]
    pub fn with_zone(mut self, zone: impl Into<String>) -> Self {
        self.zone = Some(zone.into());
        self
    }

    /// Set the raw photo bytes.
    #[must_use]
    pub fn with_photo(mut self, photo: Vec<u8>) -> Self {
        self.photo = Some(photo);
        self
    }

    /// Set the reminder.
    #[must_use]
    pub fn with_reminder(mut self, reminder: ReminderInterval) -> Self {
        self.reminder = Some(reminder);
        self
    }

    /// Memo with blank text treated as absent.
    #[must_use]
    pub fn memo(&self) -> Option<&str> {
        non_blank(self.memo.as_deref())
    }

    /// Floor with blank text treated as absent.
    #[must_use]
    pub fn floor(&self) -> Option<&str> {
        non_blank(self.floor.as_deref())
    }

    /// Zone with blank text treated as absent.
    #[must_use]
    pub fn zone(&self) -> Option<&str> {
        non_blank(self.zone.as_deref())
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Where the vehicle is parked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParkingRecord {
    /// Latitude in degrees.
    pub latitude: f64,

    /// Longitude in degrees.
    pub longitude: f64,

    /// Accuracy radius of the fix, in meters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy_meters: Option<f64>,

    /// Compressed photo of the spot.
    #[serde(default)]
    pub photo: Option<Photo>,

    /// Free-text note.
    #[serde(default)]
    pub memo: Option<String>,

    /// Floor tag.
    #[serde(default)]
    pub floor: Option<String>,

    /// Zone tag.
    #[serde(default)]
    pub zone: Option<String>,

    /// When the record was saved. Set once by [`ParkingRecord::assemble`].
    created_at: DateTime<Utc>,

    /// Reminder delay after `created_at`. Zero or absent means none.
    #[serde(default, deserialize_with = "deserialize_reminder")]
    pub reminder_minutes: Option<ReminderInterval>,
}

fn deserialize_reminder<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<ReminderInterval>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<u32>::deserialize(deserializer)? {
        Some(minutes) => ReminderInterval::from_minutes(minutes).map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}

impl ParkingRecord {
    /// Assemble a record from a fix, an already compressed photo and the
    /// draft's text fields, stamped with the current time.
    pub(crate) fn assemble(position: &Position, photo: Option<Photo>, draft: &ParkingDraft) -> Self {
        Self {
            latitude: position.latitude,
            longitude: position.longitude,
            accuracy_meters: Some(position.accuracy_meters),
            photo,
            memo: draft.memo().map(str::to_string),
            floor: draft.floor().map(str::to_string),
            zone: draft.zone().map(str::to_string),
            created_at: Utc::now(),
            reminder_minutes: draft.reminder,
        }
    }

    /// Bare record at the given coordinates.
    #[cfg(test)]
    pub(crate) fn for_position(latitude: f64, longitude: f64) -> Self {
        let position = Position {
            latitude,
            longitude,
            accuracy_meters: 5.0,
        };
        Self::assemble(&position, None, &ParkingDraft::default())
    }

    /// When the record was saved.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Check the record's coordinates.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCoordinates`] if the coordinates are not a
    /// valid position.
    pub fn validate(&self) -> Result<()> {
        geo::validate_coordinates(self.latitude, self.longitude)
    }

    /// When the reminder for this record is due, if one was requested.
    #[must_use]
    pub fn reminder_due_at(&self) -> Option<DateTime<Utc>> {
        self.reminder_minutes
            .map(|interval| self.created_at + chrono::Duration::minutes(i64::from(interval.minutes())))
    }

    /// Directions link to this spot.
    #[must_use]
    pub fn directions_url(&self) -> String {
        geo::directions_url(self.latitude, self.longitude)
    }

    /// Distance from the given point to this spot, in meters.
    #[must_use]
    pub fn distance_from(&self, latitude: f64, longitude: f64) -> f64 {
        geo::distance_meters(latitude, longitude, self.latitude, self.longitude)
    }

    /// One-line summary for notifications and listings.
    #[must_use]
    pub fn summary(&self) -> String {
        let mut parts = Vec::new();
        if let Some(floor) = &self.floor {
            parts.push(format!("floor {floor}"));
        }
        if let Some(zone) = &self.zone {
            parts.push(format!("zone {zone}"));
        }
        if let Some(memo) = &self.memo {
            parts.push(memo.clone());
        }
        if parts.is_empty() {
            format!("{:.5}, {:.5}", self.latitude, self.longitude)
        } else {
            parts.join(" · ")
        }
    }
}

/// A record the manager assembled but could not write.
///
/// Only the manager creates one, so a retried record always carries the
/// timestamp it was given at save time. Callers can inspect it but cannot
/// build one from their own [`ParkingRecord`]:
///
/// ```compile_fail
/// use parkspot::{ParkingRecord, UnsavedRecord};
///
/// fn forge(record: ParkingRecord) -> UnsavedRecord {
///     UnsavedRecord(record)
/// }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct UnsavedRecord(ParkingRecord);

impl UnsavedRecord {
    pub(crate) fn new(record: ParkingRecord) -> Self {
        Self(record)
    }

    /// The record that was not written.
    #[must_use]
    pub fn record(&self) -> &ParkingRecord {
        &self.0
    }

    pub(crate) fn into_record(self) -> ParkingRecord {
        self.0
    }
}
