//! Notification Retention Task
//!
//! Background task that periodically prunes old resolved notifications.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::notify::JobNotificationTracker;

/// Spawns a background task that drops resolved notifications older than
/// `max_age` every `interval`. Pending notifications are never touched.
///
/// The returned handle is aborted during graceful shutdown.
///
/// # Example
/// ```ignore
/// let tracker = Arc::new(JobNotificationTracker::default());
/// let retention = spawn_retention_task(tracker.clone(), Duration::from_secs(60), Duration::from_secs(3600));
/// // Later, during shutdown:
/// retention.abort();
/// ```
pub fn spawn_retention_task(
    tracker: Arc<JobNotificationTracker>,
    interval: Duration,
    max_age: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(
            interval_secs = interval.as_secs(),
            max_age_secs = max_age.as_secs(),
            "Starting notification retention task"
        );

        loop {
            tokio::time::sleep(interval).await;

            // An age beyond chrono's range means nothing is old enough yet.
            let Some(cutoff) = chrono::Duration::from_std(max_age)
                .ok()
                .and_then(|age| Utc::now().checked_sub_signed(age))
            else {
                continue;
            };
            let removed = tracker.prune_resolved_before(cutoff);

            if removed > 0 {
                info!(removed, "Retention: pruned resolved notifications");
            } else {
                debug!("Retention: nothing to prune");
            }
        }
    })
}
