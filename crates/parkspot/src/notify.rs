//! Local notifications.
//!
//! This module defines the platform seam for showing notifications
//! ([`Notifier`]) and the [`NotificationScheduler`] built on it. Delivery is
//! best effort throughout: a missing permission or a failing platform is
//! logged and otherwise ignored.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::OnceCell;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

/// Outcome of a notification permission request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    /// Notifications may be shown.
    Granted,
    /// The user refused.
    Denied,
    /// The platform has no notification capability.
    Unsupported,
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Granted => write!(f, "granted"),
            Self::Denied => write!(f, "denied"),
            Self::Unsupported => write!(f, "unsupported"),
        }
    }
}

/// A notification to display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Short title.
    pub title: String,
    /// Body text.
    pub body: String,
}

impl Notification {
    /// Create a notification.
    #[must_use]
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
        }
    }
}

/// Trait for platform-specific notification display.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync + fmt::Debug {
    /// The name of this notifier (for logging/debugging).
    fn name(&self) -> &'static str;

    /// Ask the platform (and possibly the user) for permission.
    async fn request_permission(&self) -> Permission;

    /// Display a notification.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform fails to display it.
    async fn show(&self, notification: &Notification) -> Result<()>;
}

/// Delivers notifications as log events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

#[async_trait::async_trait]
impl Notifier for TracingNotifier {
    fn name(&self) -> &'static str {
        "tracing"
    }

    async fn request_permission(&self) -> Permission {
        Permission::Granted
    }

    async fn show(&self, notification: &Notification) -> Result<()> {
        info!(title = %notification.title, "{}", notification.body);
        Ok(())
    }
}

/// A notifier for hosts without notifications, or with them turned off.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledNotifier;

#[async_trait::async_trait]
impl Notifier for DisabledNotifier {
    fn name(&self) -> &'static str {
        "disabled"
    }

    async fn request_permission(&self) -> Permission {
        Permission::Unsupported
    }

    async fn show(&self, _notification: &Notification) -> Result<()> {
        Err(Error::NotificationUnsupported)
    }
}

static NEXT_SCHEDULE_ID: AtomicU64 = AtomicU64::new(1);

/// A pending one-shot notification.
///
/// Dropping the handle does not cancel the notification.
#[derive(Debug)]
pub struct ScheduleHandle {
    id: u64,
    fire_at: DateTime<Utc>,
    task: JoinHandle<()>,
}

impl ScheduleHandle {
    /// Identifier of this schedule, unique within the process.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// When the notification is due.
    #[must_use]
    pub fn fire_at(&self) -> DateTime<Utc> {
        self.fire_at
    }

    /// Whether the notification has neither fired nor been cancelled.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        !self.task.is_finished()
    }

    /// Cancel the notification if it has not fired yet.
    pub fn cancel(&self) {
        if self.is_pending() {
            debug!("Cancelling scheduled notification {}", self.id);
            self.task.abort();
        }
    }

    /// Wait until the notification has fired or been cancelled.
    pub async fn wait(self) {
        // A cancelled task reports a JoinError; either way it is done.
        let _ = self.task.await;
    }
}

/// Permission-aware immediate and delayed notifications.
///
/// The platform is asked for permission at most once; the answer is shared
/// by every clone of the scheduler.
#[derive(Debug, Clone)]
pub struct NotificationScheduler {
    notifier: Arc<dyn Notifier>,
    permission: Arc<OnceCell<Permission>>,
}

impl NotificationScheduler {
    /// Create a scheduler over the given notifier.
    #[must_use]
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self {
            notifier,
            permission: Arc::new(OnceCell::new()),
        }
    }

    /// Name of the underlying notifier.
    #[must_use]
    pub fn notifier_name(&self) -> &'static str {
        self.notifier.name()
    }

    /// Request notification permission, asking the platform only once.
    pub async fn request_permission(&self) -> Permission {
        *self
            .permission
            .get_or_init(|| async {
                let permission = self.notifier.request_permission().await;
                info!(
                    "Notification permission via {}: {}",
                    self.notifier.name(),
                    permission
                );
                permission
            })
            .await
    }

    /// Show a notification now. Does nothing unless permission is granted.
    pub async fn notify_now(&self, title: impl Into<String>, body: impl Into<String>) {
        self.deliver(Notification::new(title, body)).await;
    }

    /// Show a notification once `delay` has elapsed.
    ///
    /// Each call schedules an independent notification; earlier schedules
    /// are left alone. Must be called from within a tokio runtime.
    #[must_use = "dropping the handle forfeits the ability to cancel"]
    pub fn schedule_one_shot(
        &self,
        delay: Duration,
        title: impl Into<String>,
        body: impl Into<String>,
    ) -> ScheduleHandle {
        let id = NEXT_SCHEDULE_ID.fetch_add(1, Ordering::Relaxed);
        let fire_at = Utc::now()
            + chrono::Duration::from_std(delay).unwrap_or_else(|_| chrono::Duration::zero());
        let notification = Notification::new(title, body);
        let scheduler = self.clone();

        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            debug!("Scheduled notification {} is due", id);
            scheduler.deliver(notification).await;
        });

        debug!("Scheduled notification {} for {}", id, fire_at);
        ScheduleHandle { id, fire_at, task }
    }

    async fn deliver(&self, notification: Notification) {
        let permission = self.request_permission().await;
        if permission != Permission::Granted {
            debug!(
                "Suppressing notification '{}' (permission {})",
                notification.title, permission
            );
            return;
        }

        if let Err(e) = self.notifier.show(&notification).await {
            warn!("Failed to show notification '{}': {}", notification.title, e);
        }
    }
}
