//! Job Notification Tracker
//!
//! Owns the lifecycle of operation notifications and fans every transition
//! out to subscribers.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{OpsError, Result};
use crate::notify::{
    Notification, NotificationError, NotificationHistory, NotificationMessage, NotificationStatus,
};

/// Resolved notifications kept by [`JobNotificationTracker::default`].
pub const DEFAULT_HISTORY_CAPACITY: usize = 50;

struct TrackerState {
    pending: HashMap<String, Notification>,
    history: NotificationHistory,
    subscribers: Vec<mpsc::UnboundedSender<Notification>>,
}

impl TrackerState {
    /// Delivers a transition to every live subscriber, dropping closed ones.
    fn publish(&mut self, notification: &Notification) {
        self.subscribers.retain(|tx| tx.send(notification.clone()).is_ok());
    }
}

// == Job Notification Tracker ==
/// Tracks notifications from `Pending` to `Succeeded` or `Failed`.
///
/// All mutation happens under a short synchronous lock, and transitions are
/// published while it is held, so every subscriber sees the transitions of
/// one id in the order they happened.
pub struct JobNotificationTracker {
    state: Mutex<TrackerState>,
}

impl Default for JobNotificationTracker {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

impl JobNotificationTracker {
    pub fn new(history_capacity: usize) -> Self {
        Self {
            state: Mutex::new(TrackerState {
                pending: HashMap::new(),
                history: NotificationHistory::new(history_capacity),
                subscribers: Vec::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, TrackerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // == Add ==
    /// Registers a pending notification and returns its id.
    ///
    /// Without an explicit id a UUID v7 is generated. Fails with
    /// [`OpsError::DuplicateId`] while a pending notification uses the id; a
    /// resolved one with the same id is replaced.
    pub fn add(&self, message: impl Into<NotificationMessage>, id: Option<String>) -> Result<String> {
        let id = id.unwrap_or_else(|| Uuid::now_v7().to_string());
        let mut state = self.lock();

        if state.pending.contains_key(&id) {
            warn!(id = %id, "Notification id already pending");
            return Err(OpsError::DuplicateId(id));
        }
        state.history.remove(&id);

        let notification = Notification::pending(id.clone(), message.into());
        state.publish(&notification);
        state.pending.insert(id.clone(), notification);

        info!(id = %id, "Notification added");
        Ok(id)
    }

    // == Finish ==
    /// Marks a pending notification as succeeded, optionally replacing its
    /// message. Unknown or already resolved ids are a logged no-op.
    pub fn finish(&self, id: &str, message: Option<NotificationMessage>) -> bool {
        self.resolve(id, NotificationStatus::Succeeded, message, None)
    }

    // == Fail ==
    /// Marks a pending notification as failed, keeping the error and its
    /// backend payload for observers. Unknown or already resolved ids are a
    /// logged no-op.
    pub fn fail(
        &self,
        id: &str,
        message: Option<NotificationMessage>,
        error: Option<NotificationError>,
    ) -> bool {
        self.resolve(id, NotificationStatus::Failed, message, error)
    }

    fn resolve(
        &self,
        id: &str,
        status: NotificationStatus,
        message: Option<NotificationMessage>,
        error: Option<NotificationError>,
    ) -> bool {
        let mut state = self.lock();

        let Some(mut notification) = state.pending.remove(id) else {
            warn!(id = %id, status = ?status, "Ignoring transition for unknown or resolved notification");
            return false;
        };
        notification.resolve(status, message, error);

        state.publish(&notification);
        for evicted in state.history.push(notification) {
            debug!(id = %evicted, "Notification evicted from history");
        }

        info!(id = %id, status = ?status, "Notification resolved");
        true
    }

    // == Subscribe ==
    /// Starts delivering every subsequent transition to a new observer.
    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        self.lock().subscribers.push(tx);
        Subscription { rx }
    }

    /// Observers still registered. Closed subscriptions are dropped lazily on
    /// the next transition.
    pub fn subscriber_count(&self) -> usize {
        self.lock().subscribers.iter().filter(|tx| !tx.is_closed()).count()
    }

    // == Queries ==
    /// Looks up a pending or resolved notification.
    pub fn get(&self, id: &str) -> Option<Notification> {
        let state = self.lock();
        state
            .pending
            .get(id)
            .or_else(|| state.history.get(id))
            .cloned()
    }

    /// Pending notifications, oldest first.
    pub fn pending(&self) -> Vec<Notification> {
        let mut pending: Vec<_> = self.lock().pending.values().cloned().collect();
        pending.sort_by_key(|n| n.created_at);
        pending
    }

    pub fn pending_count(&self) -> usize {
        self.lock().pending.len()
    }

    /// Resolved notifications, newest first.
    pub fn history(&self) -> Vec<Notification> {
        self.lock().history.iter().cloned().collect()
    }

    // == Removal ==
    /// Dismisses a resolved notification. Pending notifications stay.
    pub fn remove(&self, id: &str) -> Option<Notification> {
        let removed = self.lock().history.remove(id);
        if removed.is_none() {
            debug!(id = %id, "No resolved notification to remove");
        }
        removed
    }

    pub fn clear_history(&self) -> usize {
        self.lock().history.clear()
    }

    /// Drops resolved notifications older than `cutoff`.
    pub fn prune_resolved_before(&self, cutoff: DateTime<Utc>) -> usize {
        self.lock().history.prune_before(cutoff)
    }
}

// == Subscription ==
/// Stream of notification transitions for one observer. Dropping it
/// unsubscribes without affecting other observers.
#[derive(Debug)]
pub struct Subscription {
    rx: mpsc::UnboundedReceiver<Notification>,
}

impl Subscription {
    /// Waits for the next transition. Returns `None` once the tracker is gone.
    pub async fn recv(&mut self) -> Option<Notification> {
        self.rx.recv().await
    }

    /// Next transition if one is already queued.
    pub fn try_recv(&mut self) -> Option<Notification> {
        self.rx.try_recv().ok()
    }

    /// Everything queued right now.
    pub fn drain(&mut self) -> Vec<Notification> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }

    pub fn unsubscribe(self) {}
}
