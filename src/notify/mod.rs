//! Notify Module
//!
//! User-visible notifications for tracked operations.

mod history;
mod notification;
mod tracker;

#[cfg(test)]
mod property_tests;

pub use history::NotificationHistory;
pub use notification::{Notification, NotificationError, NotificationMessage, NotificationStatus};
pub use tracker::{JobNotificationTracker, Subscription, DEFAULT_HISTORY_CAPACITY};
