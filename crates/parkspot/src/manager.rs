//! The parking record state machine.
//!
//! [`ParkingManager`] owns the single current record and coordinates the
//! other components around it: photo compression and a position fix before
//! anything is written, then persistence, history, a confirmation and an
//! optional reminder.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::geo::Position;
use crate::location::{GeoLocator, LocateOptions, PositionSource};
use crate::notify::{DisabledNotifier, NotificationScheduler, Notifier, ScheduleHandle};
use crate::photo::ImageCompressor;
use crate::record::{ParkingDraft, ParkingRecord, UnsavedRecord};
use crate::storage::Storage;

/// Title of the notification shown after a successful save.
pub const SAVED_TITLE: &str = "Parking location saved";

/// Title of the notification shown after a delete.
pub const DELETED_TITLE: &str = "Parking location deleted";

/// Title of the reminder notification.
pub const REMINDER_TITLE: &str = "Parking reminder";

/// Whether a vehicle is currently recorded as parked.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ParkingState {
    /// No current record.
    #[default]
    Empty,
    /// A current record exists.
    Occupied(ParkingRecord),
}

impl ParkingState {
    /// Whether a record is present.
    #[must_use]
    pub fn is_occupied(&self) -> bool {
        matches!(self, Self::Occupied(_))
    }

    /// The current record, if any.
    #[must_use]
    pub fn record(&self) -> Option<&ParkingRecord> {
        match self {
            Self::Empty => None,
            Self::Occupied(record) => Some(record),
        }
    }

    fn into_record(self) -> Option<ParkingRecord> {
        match self {
            Self::Empty => None,
            Self::Occupied(record) => Some(record),
        }
    }
}

impl From<Option<ParkingRecord>> for ParkingState {
    fn from(record: Option<ParkingRecord>) -> Self {
        record.map_or(Self::Empty, Self::Occupied)
    }
}

/// Behavior switches for [`ParkingManager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManagerOptions {
    /// Options for every position query.
    pub locate: LocateOptions,
    /// Push each saved record onto the history instead of the record it
    /// replaces.
    pub record_current_in_history: bool,
    /// Cancel the pending reminder of a record when it is deleted.
    pub cancel_reminder_on_delete: bool,
}

impl Default for ManagerOptions {
    fn default() -> Self {
        Self {
            locate: LocateOptions::default(),
            record_current_in_history: false,
            cancel_reminder_on_delete: true,
        }
    }
}

impl From<&Config> for ManagerOptions {
    fn from(config: &Config) -> Self {
        Self {
            locate: LocateOptions::from(&config.location),
            record_current_in_history: config.storage.record_current_in_history,
            cancel_reminder_on_delete: config.notifications.cancel_reminder_on_delete,
        }
    }
}

/// A scheduled reminder and the record it belongs to.
#[derive(Debug)]
struct PendingReminder {
    record_created_at: DateTime<Utc>,
    handle: ScheduleHandle,
}

/// Owns the current parking record.
///
/// Mutating operations take `&mut self`, so at most one save or delete is in
/// flight at a time.
#[derive(Debug)]
pub struct ParkingManager {
    storage: Storage,
    locator: GeoLocator,
    compressor: ImageCompressor,
    scheduler: NotificationScheduler,
    options: ManagerOptions,
    state: ParkingState,
    reminder: Option<PendingReminder>,
    // Storage holds a `current` value that could not be parsed
    unreadable_current: bool,
}

impl ParkingManager {
    /// Create a manager in the Empty state. Call [`load`](Self::load) to pick
    /// up a previously persisted record.
    #[must_use]
    pub fn new(
        storage: Storage,
        locator: GeoLocator,
        compressor: ImageCompressor,
        scheduler: NotificationScheduler,
        options: ManagerOptions,
    ) -> Self {
        Self {
            storage,
            locator,
            compressor,
            scheduler,
            options,
            state: ParkingState::Empty,
            reminder: None,
            unreadable_current: false,
        }
    }

    /// Build a manager from configuration and the platform seams, then load
    /// the persisted record.
    ///
    /// When notifications are disabled in `config` the given notifier is
    /// replaced by [`DisabledNotifier`].
    ///
    /// # Errors
    ///
    /// Returns an error if the persisted record cannot be read.
    pub async fn from_config(
        config: &Config,
        storage: Storage,
        source: Arc<dyn PositionSource>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self> {
        let notifier: Arc<dyn Notifier> = if config.notifications.enabled {
            notifier
        } else {
            Arc::new(DisabledNotifier)
        };

        let mut manager = Self::new(
            storage,
            GeoLocator::new(source),
            ImageCompressor::from(&config.photo),
            NotificationScheduler::new(notifier),
            ManagerOptions::from(config),
        );
        manager.load().await?;
        Ok(manager)
    }

    /// Re-read the current record from storage and adopt it as the state.
    ///
    /// A stored value that cannot be parsed is logged and loads as Empty, so
    /// a later [`save`](Self::save) or [`delete`](Self::delete) can replace
    /// or clear it.
    ///
    /// # Errors
    ///
    /// Returns an error if storage cannot be read. The state is unchanged
    /// in that case.
    pub async fn load(&mut self) -> Result<&ParkingState> {
        let current = match self.storage.current().await {
            Ok(current) => {
                self.unreadable_current = false;
                current
            }
            Err(Error::Json(e)) => {
                warn!("Stored parking record is unreadable, starting empty: {}", e);
                self.unreadable_current = true;
                None
            }
            Err(e) => return Err(e),
        };
        debug!(
            "Loaded state from {} backend: {}",
            self.storage.backend_name(),
            if current.is_some() { "occupied" } else { "empty" }
        );
        self.state = ParkingState::from(current);
        Ok(&self.state)
    }

    /// Record where the vehicle is parked.
    ///
    /// Compresses the draft's photo, acquires a position fix, assembles the
    /// record and hands it to [`commit`](Self::commit). Works from either
    /// state; an existing record is replaced.
    ///
    /// # Errors
    ///
    /// - [`Error::ImageDecode`] or [`Error::ImageEncode`] for a bad photo,
    ///   before any position query is made
    /// - [`Error::Location`] when no fix could be acquired
    /// - [`Error::NotPersisted`] when the record could not be written
    ///
    /// The state is unchanged on every error.
    pub async fn save(&mut self, draft: &ParkingDraft) -> Result<ParkingRecord> {
        let photo = match &draft.photo {
            Some(raw) => Some(self.compressor.compress(raw).await?),
            None => None,
        };

        let position = self.locator.locate(&self.options.locate).await?;
        debug!(
            "Acquired fix ({:.6}, {:.6}) ±{}m",
            position.latitude, position.longitude, position.accuracy_meters
        );

        let record = ParkingRecord::assemble(&position, photo, draft);
        self.persist(record).await
    }

    /// Write a record again after [`save`](Self::save) failed with
    /// [`Error::NotPersisted`], without a new position fix.
    ///
    /// The record keeps the creation time it was given by `save`. Its
    /// reminder is scheduled relative to that time, so a late retry fires
    /// correspondingly sooner.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotPersisted`] again when the write still fails.
    pub async fn commit(&mut self, unsaved: UnsavedRecord) -> Result<ParkingRecord> {
        self.persist(unsaved.into_record()).await
    }

    async fn persist(&mut self, record: ParkingRecord) -> Result<ParkingRecord> {
        record.validate()?;

        if let Err(source) = self.storage.set_current(&record).await {
            warn!("Failed to persist parking record: {}", source);
            return Err(Error::NotPersisted {
                record: Box::new(UnsavedRecord::new(record)),
                source: Box::new(source),
            });
        }
        self.unreadable_current = false;

        let previous = std::mem::replace(&mut self.state, ParkingState::Occupied(record.clone()));
        info!("Parking record saved: {}", record.summary());

        let history_entry = if self.options.record_current_in_history {
            Some(record.clone())
        } else {
            previous.into_record()
        };
        if let Some(entry) = history_entry {
            if let Err(e) = self.storage.push_history(entry).await {
                warn!("Failed to update parking history: {}", e);
            }
        }

        self.scheduler
            .notify_now(SAVED_TITLE, record.summary())
            .await;

        if let Some(interval) = record.reminder_minutes {
            let delay = record
                .reminder_due_at()
                .and_then(|due| (due - Utc::now()).to_std().ok())
                .unwrap_or(Duration::ZERO);
            let handle = self.scheduler.schedule_one_shot(
                delay,
                REMINDER_TITLE,
                format!("Parked {interval} ago: {}", record.summary()),
            );
            info!("Reminder scheduled for {}", handle.fire_at());

            // Replacing the handle leaves an earlier reminder running.
            self.reminder = Some(PendingReminder {
                record_created_at: record.created_at(),
                handle,
            });
        }

        Ok(record)
    }

    /// Delete the current record.
    ///
    /// Returns `false` without touching storage when there is nothing to
    /// delete. An unreadable stored value found by [`load`](Self::load) is
    /// cleared and counts as deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be removed from storage. The
    /// state stays Occupied in that case.
    pub async fn delete(&mut self) -> Result<bool> {
        let ParkingState::Occupied(record) = &self.state else {
            if self.unreadable_current {
                self.storage.clear_current().await?;
                self.unreadable_current = false;
                info!("Cleared unreadable parking record");
                return Ok(true);
            }
            debug!("Delete requested with no current record");
            return Ok(false);
        };
        let created_at = record.created_at();
        let summary = record.summary();

        self.storage.clear_current().await?;
        self.state = ParkingState::Empty;
        info!("Parking record deleted: {}", summary);

        let owns_reminder = self
            .reminder
            .as_ref()
            .is_some_and(|r| r.record_created_at == created_at);
        if self.options.cancel_reminder_on_delete && owns_reminder {
            if let Some(reminder) = self.reminder.take() {
                reminder.handle.cancel();
            }
        }

        self.scheduler.notify_now(DELETED_TITLE, summary).await;
        Ok(true)
    }

    /// The current state.
    #[must_use]
    pub fn state(&self) -> &ParkingState {
        &self.state
    }

    /// Whether a record is present.
    #[must_use]
    pub fn is_occupied(&self) -> bool {
        self.state.is_occupied()
    }

    /// The current record, if any.
    #[must_use]
    pub fn current(&self) -> Option<&ParkingRecord> {
        self.state.record()
    }

    /// Past records, most recent first.
    ///
    /// # Errors
    ///
    /// Returns an error if storage cannot be read.
    pub async fn history(&self) -> Result<Vec<ParkingRecord>> {
        self.storage.history().await
    }

    /// The reminder of the most recent save, while it has not fired.
    #[must_use]
    pub fn pending_reminder(&self) -> Option<&ScheduleHandle> {
        self.reminder
            .as_ref()
            .map(|r| &r.handle)
            .filter(|handle| handle.is_pending())
    }

    /// Take ownership of the most recent reminder handle, e.g. to wait for it.
    pub fn take_reminder(&mut self) -> Option<ScheduleHandle> {
        self.reminder.take().map(|r| r.handle)
    }

    /// Navigation link to the current record.
    #[must_use]
    pub fn directions_url(&self) -> Option<String> {
        self.current().map(ParkingRecord::directions_url)
    }

    /// Distance in meters from `position` to the current record.
    #[must_use]
    pub fn distance_from(&self, position: &Position) -> Option<f64> {
        self.current()
            .map(|record| record.distance_from(position.latitude, position.longitude))
    }

    /// The underlying store.
    #[must_use]
    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// The notification scheduler.
    #[must_use]
    pub fn scheduler(&self) -> &NotificationScheduler {
        &self.scheduler
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::{FixedPosition, LocationError};
    use crate::notify::Permission;
    use crate::record::ReminderInterval;
    use crate::storage::{Backend, MemoryBackend, StoreKey, HISTORY_LIMIT};
    use crate::testing::{CountingSource, FailingSource, FlakyBackend, PendingSource, RecordingNotifier};

    const SEOUL: (f64, f64) = (37.5665, 126.9780);

    fn position(latitude: f64, longitude: f64) -> Position {
        Position::new(latitude, longitude, 8.0).unwrap()
    }

    fn manager_with(
        storage: Storage,
        source: Arc<dyn PositionSource>,
        options: ManagerOptions,
    ) -> (ParkingManager, Arc<RecordingNotifier>) {
        let notifier = Arc::new(RecordingNotifier::new(Permission::Granted));
        let manager = ParkingManager::new(
            storage,
            GeoLocator::new(source),
            ImageCompressor::default(),
            NotificationScheduler::new(notifier.clone()),
            options,
        );
        (manager, notifier)
    }

    fn manager_at(latitude: f64, longitude: f64) -> (ParkingManager, Arc<RecordingNotifier>) {
        manager_with(
            Storage::in_memory(),
            Arc::new(FixedPosition::new(position(latitude, longitude))),
            ManagerOptions::default(),
        )
    }

    fn titles(notifier: &RecordingNotifier) -> Vec<String> {
        notifier.shown().into_iter().map(|n| n.title).collect()
    }

    #[tokio::test]
    async fn test_starts_empty() {
        let (manager, _) = manager_at(SEOUL.0, SEOUL.1);
        assert_eq!(manager.state(), &ParkingState::Empty);
        assert!(manager.current().is_none());
        assert!(manager.directions_url().is_none());
        assert!(manager.pending_reminder().is_none());
    }

    #[tokio::test]
    async fn test_save_then_load_returns_exact_coordinates() {
        for (lat, lng) in [(SEOUL.0, SEOUL.1), (-33.8688, 151.2093), (0.0, 0.0), (90.0, -180.0)] {
            let storage = Storage::in_memory();
            let (mut manager, _) = manager_with(
                storage.clone(),
                Arc::new(FixedPosition::new(position(lat, lng))),
                ManagerOptions::default(),
            );
            manager.save(&ParkingDraft::new()).await.unwrap();

            // A fresh manager over the same store sees the record
            let (mut reloaded, _) = manager_with(
                storage,
                Arc::new(FailingSource(LocationError::PositionUnavailable)),
                ManagerOptions::default(),
            );
            reloaded.load().await.unwrap();

            let record = reloaded.current().unwrap();
            assert_eq!(record.latitude, lat);
            assert_eq!(record.longitude, lng);
        }
    }

    #[tokio::test]
    async fn test_second_save_replaces_first() {
        let storage = Storage::in_memory();
        let source = Arc::new(CountingSource::new(position(10.0, 20.0)));
        let (mut manager, _) =
            manager_with(storage.clone(), source.clone(), ManagerOptions::default());

        manager
            .save(&ParkingDraft::new().with_memo("first"))
            .await
            .unwrap();
        manager
            .save(&ParkingDraft::new().with_memo("second"))
            .await
            .unwrap();

        let stored = storage.current().await.unwrap().unwrap();
        assert_eq!(stored.memo.as_deref(), Some("second"));
        assert_eq!(manager.current(), Some(&stored));
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn test_delete_on_empty_is_noop() {
        let (mut manager, notifier) = manager_at(SEOUL.0, SEOUL.1);
        assert!(!manager.delete().await.unwrap());
        assert_eq!(manager.state(), &ParkingState::Empty);
        assert!(notifier.shown().is_empty());
    }

    #[tokio::test]
    async fn test_delete_on_occupied() {
        let storage = Storage::in_memory();
        let (mut manager, notifier) = manager_with(
            storage.clone(),
            Arc::new(FixedPosition::new(position(SEOUL.0, SEOUL.1))),
            ManagerOptions::default(),
        );
        manager.save(&ParkingDraft::new()).await.unwrap();

        assert!(manager.delete().await.unwrap());
        assert!(!manager.is_occupied());
        assert!(storage.current().await.unwrap().is_none());
        assert_eq!(manager.load().await.unwrap(), &ParkingState::Empty);
        assert_eq!(titles(&notifier), vec![SAVED_TITLE, DELETED_TITLE]);
    }

    #[tokio::test]
    async fn test_draft_fields_are_normalized() {
        let (mut manager, _) = manager_at(SEOUL.0, SEOUL.1);
        let draft = ParkingDraft::new()
            .with_memo("  near the elevator ")
            .with_floor("   ")
            .with_zone("C-14");

        let record = manager.save(&draft).await.unwrap();
        assert_eq!(record.memo.as_deref(), Some("near the elevator"));
        assert_eq!(record.floor, None);
        assert_eq!(record.zone.as_deref(), Some("C-14"));
        assert_eq!(record.accuracy_meters, Some(8.0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_save_scenario_with_reminder() {
        let (mut manager, notifier) = manager_at(SEOUL.0, SEOUL.1);
        let draft = ParkingDraft::new()
            .with_memo("엘리베이터 근처")
            .with_reminder(ReminderInterval::HalfHour);

        let record = manager.save(&draft).await.unwrap();
        assert_eq!(record.latitude, SEOUL.0);
        assert_eq!(record.longitude, SEOUL.1);
        assert_eq!(record.memo.as_deref(), Some("엘리베이터 근처"));
        assert_eq!(record.reminder_minutes, Some(ReminderInterval::HalfHour));
        assert_eq!(manager.current(), Some(&record));

        // The confirmation is immediate
        assert_eq!(titles(&notifier), vec![SAVED_TITLE]);

        let handle = manager.pending_reminder().unwrap();
        let offset = handle.fire_at() - record.created_at();
        assert!((offset - chrono::Duration::minutes(30)).num_seconds().abs() <= 1);

        tokio::time::sleep(Duration::from_secs(29 * 60)).await;
        assert_eq!(titles(&notifier), vec![SAVED_TITLE]);

        manager.take_reminder().unwrap().wait().await;
        assert_eq!(titles(&notifier), vec![SAVED_TITLE, REMINDER_TITLE]);
        assert!(notifier.shown()[1].body.contains("엘리베이터 근처"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_replacing_record_keeps_earlier_reminder() {
        let (mut manager, notifier) = manager_at(SEOUL.0, SEOUL.1);
        manager
            .save(&ParkingDraft::new().with_reminder(ReminderInterval::HalfHour))
            .await
            .unwrap();
        manager
            .save(&ParkingDraft::new().with_reminder(ReminderInterval::OneHour))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_secs(61 * 60)).await;
        let reminders = titles(&notifier)
            .into_iter()
            .filter(|t| t == REMINDER_TITLE)
            .count();
        assert_eq!(reminders, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_cancels_reminder() {
        let (mut manager, notifier) = manager_at(SEOUL.0, SEOUL.1);
        manager
            .save(&ParkingDraft::new().with_reminder(ReminderInterval::HalfHour))
            .await
            .unwrap();
        assert!(manager.pending_reminder().is_some());

        manager.delete().await.unwrap();
        assert!(manager.pending_reminder().is_none());

        tokio::time::sleep(Duration::from_secs(31 * 60)).await;
        assert_eq!(titles(&notifier), vec![SAVED_TITLE, DELETED_TITLE]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_keeps_reminder_when_configured() {
        let options = ManagerOptions {
            cancel_reminder_on_delete: false,
            ..ManagerOptions::default()
        };
        let (mut manager, notifier) = manager_with(
            Storage::in_memory(),
            Arc::new(FixedPosition::new(position(SEOUL.0, SEOUL.1))),
            options,
        );
        manager
            .save(&ParkingDraft::new().with_reminder(ReminderInterval::HalfHour))
            .await
            .unwrap();
        manager.delete().await.unwrap();

        tokio::time::sleep(Duration::from_secs(31 * 60)).await;
        assert_eq!(
            titles(&notifier),
            vec![SAVED_TITLE, DELETED_TITLE, REMINDER_TITLE]
        );
    }

    #[tokio::test]
    async fn test_location_failure_leaves_state() {
        for error in [
            LocationError::PermissionDenied,
            LocationError::PositionUnavailable,
            LocationError::unavailable("no GPS hardware"),
        ] {
            let (mut manager, notifier) = manager_with(
                Storage::in_memory(),
                Arc::new(FailingSource(error.clone())),
                ManagerOptions::default(),
            );

            let err = manager.save(&ParkingDraft::new()).await.unwrap_err();
            assert!(matches!(err, Error::Location(ref e) if *e == error));
            assert_eq!(manager.state(), &ParkingState::Empty);
            assert!(notifier.shown().is_empty());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_location_timeout() {
        let (mut manager, _) = manager_with(
            Storage::in_memory(),
            Arc::new(PendingSource),
            ManagerOptions::default(),
        );

        let err = manager.save(&ParkingDraft::new()).await.unwrap_err();
        assert!(matches!(err, Error::Location(LocationError::Timeout)));
        assert!(!manager.is_occupied());
    }

    #[tokio::test]
    async fn test_bad_photo_fails_before_locating() {
        let source = Arc::new(CountingSource::new(position(SEOUL.0, SEOUL.1)));
        let (mut manager, _) =
            manager_with(Storage::in_memory(), source.clone(), ManagerOptions::default());

        let draft = ParkingDraft::new().with_photo(b"definitely not an image".to_vec());
        let err = manager.save(&draft).await.unwrap_err();

        assert!(matches!(err, Error::ImageDecode(_)));
        assert_eq!(source.calls(), 0);
        assert!(!manager.is_occupied());
    }

    #[tokio::test]
    async fn test_failed_write_keeps_state_and_returns_record() {
        let backend = Arc::new(FlakyBackend::new());
        let storage = Storage::new(backend.clone());
        let (mut manager, notifier) = manager_with(
            storage.clone(),
            Arc::new(FixedPosition::new(position(SEOUL.0, SEOUL.1))),
            ManagerOptions::default(),
        );

        backend.fail_writes(true);
        let before = Utc::now();
        let err = manager
            .save(&ParkingDraft::new().with_memo("B2"))
            .await
            .unwrap_err();
        let after = Utc::now();

        assert!(err.is_storage_error());
        assert_eq!(manager.state(), &ParkingState::Empty);
        assert!(notifier.shown().is_empty());
        let unsaved = err.unsaved_record().unwrap();
        assert_eq!(unsaved.latitude, SEOUL.0);
        assert_eq!(unsaved.memo.as_deref(), Some("B2"));

        let created_at = unsaved.created_at();
        assert!(before <= created_at && created_at <= after);

        backend.fail_writes(false);
        let saved = manager.commit(err.into_unsaved().unwrap()).await.unwrap();

        // The retry keeps the timestamp assigned at save time
        assert_eq!(saved.created_at(), created_at);
        assert_eq!(manager.current(), Some(&saved));
        assert_eq!(storage.current().await.unwrap(), Some(saved));
        assert_eq!(titles(&notifier), vec![SAVED_TITLE]);
    }

    #[tokio::test]
    async fn test_failed_remove_stays_occupied() {
        let backend = Arc::new(FlakyBackend::new());
        let (mut manager, _) = manager_with(
            Storage::new(backend.clone()),
            Arc::new(FixedPosition::new(position(SEOUL.0, SEOUL.1))),
            ManagerOptions::default(),
        );
        manager.save(&ParkingDraft::new()).await.unwrap();

        backend.fail_writes(true);
        assert!(manager.delete().await.unwrap_err().is_storage_error());
        assert!(manager.is_occupied());
    }

    #[tokio::test]
    async fn test_history_records_replaced_entries() {
        let storage = Storage::in_memory();
        let (mut manager, _) = manager_with(
            storage.clone(),
            Arc::new(FixedPosition::new(position(SEOUL.0, SEOUL.1))),
            ManagerOptions::default(),
        );

        manager.save(&ParkingDraft::new().with_memo("a")).await.unwrap();
        assert!(manager.history().await.unwrap().is_empty());

        manager.save(&ParkingDraft::new().with_memo("b")).await.unwrap();
        let history = manager.history().await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].memo.as_deref(), Some("a"));
    }

    #[tokio::test]
    async fn test_history_mirrors_saves_when_configured() {
        let options = ManagerOptions {
            record_current_in_history: true,
            ..ManagerOptions::default()
        };
        let (mut manager, _) = manager_with(
            Storage::in_memory(),
            Arc::new(FixedPosition::new(position(SEOUL.0, SEOUL.1))),
            options,
        );

        for i in 0..12 {
            manager
                .save(&ParkingDraft::new().with_memo(format!("save {i}")))
                .await
                .unwrap();
        }

        let history = manager.history().await.unwrap();
        assert_eq!(history.len(), HISTORY_LIMIT);
        assert_eq!(history[0].memo.as_deref(), Some("save 11"));
        assert_eq!(history[HISTORY_LIMIT - 1].memo.as_deref(), Some("save 2"));
    }

    #[tokio::test]
    async fn test_directions_and_distance() {
        let (mut manager, _) = manager_at(SEOUL.0, SEOUL.1);
        manager.save(&ParkingDraft::new()).await.unwrap();

        assert_eq!(
            manager.directions_url().as_deref(),
            Some("https://www.google.com/maps/dir/?api=1&destination=37.5665,126.978")
        );

        let here = position(SEOUL.0, SEOUL.1);
        assert!(manager.distance_from(&here).unwrap() < 0.001);

        // Roughly 1.1 km north
        let north = position(SEOUL.0 + 0.01, SEOUL.1);
        let meters = manager.distance_from(&north).unwrap();
        assert!((meters - 1112.0).abs() < 5.0, "got {meters}");
    }

    #[tokio::test]
    async fn test_from_config_loads_existing_record() {
        let storage = Storage::in_memory();
        storage
            .set_current(&ParkingRecord::for_position(SEOUL.0, SEOUL.1))
            .await
            .unwrap();

        let manager = ParkingManager::from_config(
            &Config::default(),
            storage,
            Arc::new(FixedPosition::new(position(0.0, 0.0))),
            Arc::new(RecordingNotifier::new(Permission::Granted)),
        )
        .await
        .unwrap();

        assert!(manager.is_occupied());
        assert_eq!(manager.scheduler().notifier_name(), "recording");
    }

    #[tokio::test]
    async fn test_from_config_with_notifications_disabled() {
        let mut config = Config::default();
        config.notifications.enabled = false;

        let mut manager = ParkingManager::from_config(
            &config,
            Storage::in_memory(),
            Arc::new(FixedPosition::new(position(SEOUL.0, SEOUL.1))),
            Arc::new(RecordingNotifier::new(Permission::Granted)),
        )
        .await
        .unwrap();

        assert_eq!(manager.scheduler().notifier_name(), "disabled");
        // Saving still works without notifications
        manager.save(&ParkingDraft::new()).await.unwrap();
        assert!(manager.is_occupied());
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_keeps_reminder_anchored_to_save_time() {
        let backend = Arc::new(FlakyBackend::new());
        let (mut manager, _) = manager_with(
            Storage::new(backend.clone()),
            Arc::new(FixedPosition::new(position(SEOUL.0, SEOUL.1))),
            ManagerOptions::default(),
        );

        backend.fail_writes(true);
        let err = manager
            .save(&ParkingDraft::new().with_reminder(ReminderInterval::HalfHour))
            .await
            .unwrap_err();
        let due = err.unsaved_record().unwrap().reminder_due_at().unwrap();

        backend.fail_writes(false);
        manager.commit(err.into_unsaved().unwrap()).await.unwrap();

        let handle = manager.pending_reminder().unwrap();
        assert!((handle.fire_at() - due).num_seconds().abs() <= 1);
    }

    #[tokio::test]
    async fn test_stored_zero_reminder_loads_without_reminder() {
        let backend = Arc::new(MemoryBackend::new());
        backend
            .set(
                StoreKey::Current,
                r#"{"latitude":37.5665,"longitude":126.978,"createdAt":"2024-05-01T09:30:00Z","reminderMinutes":0}"#
                    .to_string(),
            )
            .await
            .unwrap();

        let manager = ParkingManager::from_config(
            &Config::default(),
            Storage::new(backend),
            Arc::new(FixedPosition::new(position(0.0, 0.0))),
            Arc::new(RecordingNotifier::new(Permission::Granted)),
        )
        .await
        .unwrap();

        let record = manager.current().unwrap();
        assert_eq!(record.latitude, SEOUL.0);
        assert_eq!(record.reminder_minutes, None);
    }

    #[tokio::test]
    async fn test_unreadable_current_loads_empty_and_can_be_deleted() {
        let backend = Arc::new(MemoryBackend::new());
        backend
            .set(StoreKey::Current, "{not json".to_string())
            .await
            .unwrap();

        let (mut manager, notifier) = manager_with(
            Storage::new(backend.clone()),
            Arc::new(FixedPosition::new(position(SEOUL.0, SEOUL.1))),
            ManagerOptions::default(),
        );
        assert_eq!(manager.load().await.unwrap(), &ParkingState::Empty);

        assert!(manager.delete().await.unwrap());
        assert!(backend.get(StoreKey::Current).await.unwrap().is_none());
        assert!(notifier.shown().is_empty());

        // Nothing left to clear
        assert!(!manager.delete().await.unwrap());
    }

    #[tokio::test]
    async fn test_save_overwrites_unreadable_current() {
        let backend = Arc::new(MemoryBackend::new());
        backend
            .set(StoreKey::Current, "{not json".to_string())
            .await
            .unwrap();

        let mut manager = ParkingManager::from_config(
            &Config::default(),
            Storage::new(backend),
            Arc::new(FixedPosition::new(position(SEOUL.0, SEOUL.1))),
            Arc::new(RecordingNotifier::new(Permission::Granted)),
        )
        .await
        .unwrap();
        assert!(!manager.is_occupied());

        let record = manager.save(&ParkingDraft::new()).await.unwrap();
        assert_eq!(manager.load().await.unwrap(), &ParkingState::Occupied(record));
    }

    #[tokio::test]
    async fn test_load_propagates_backend_failure() {
        let backend = Arc::new(FlakyBackend::new());
        let (mut manager, _) = manager_with(
            Storage::new(backend.clone()),
            Arc::new(FixedPosition::new(position(SEOUL.0, SEOUL.1))),
            ManagerOptions::default(),
        );
        backend.fail_reads(true);

        assert!(manager.load().await.unwrap_err().is_storage_error());
    }
}
