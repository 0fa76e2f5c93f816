//! Notification History Module
//!
//! Bounded record of resolved notifications kept for display.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};

use crate::notify::Notification;

// == Notification History ==
/// Resolved notifications in resolution order.
///
/// - Front = Most recently resolved
/// - Back = Oldest, evicted first
#[derive(Debug)]
pub struct NotificationHistory {
    entries: VecDeque<Notification>,
    capacity: usize,
}

impl NotificationHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            capacity,
        }
    }

    // == Push ==
    /// Records a resolved notification, replacing any entry with the same id.
    ///
    /// Returns the ids evicted to stay within capacity.
    pub fn push(&mut self, notification: Notification) -> Vec<String> {
        self.remove(&notification.id);
        self.entries.push_front(notification);

        let mut evicted = Vec::new();
        while self.entries.len() > self.capacity {
            if let Some(oldest) = self.entries.pop_back() {
                evicted.push(oldest.id);
            }
        }
        evicted
    }

    // == Remove ==
    pub fn remove(&mut self, id: &str) -> Option<Notification> {
        let index = self.entries.iter().position(|n| n.id == id)?;
        self.entries.remove(index)
    }

    pub fn get(&self, id: &str) -> Option<&Notification> {
        self.entries.iter().find(|n| n.id == id)
    }

    // == Prune ==
    /// Drops entries resolved before `cutoff`. Returns how many were removed.
    pub fn prune_before(&mut self, cutoff: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|n| n.resolved_at.map_or(true, |at| at >= cutoff));
        before - self.entries.len()
    }

    pub fn clear(&mut self) -> usize {
        let count = self.entries.len();
        self.entries.clear();
        count
    }

    /// Newest first.
    pub fn iter(&self) -> impl Iterator<Item = &Notification> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
