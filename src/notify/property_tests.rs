//! Property-Based Tests for the Notification Tracker
//!
//! Random add/finish/fail sequences must always produce valid lifecycles.

use proptest::prelude::*;
use std::collections::HashMap;

use crate::error::OpsError;
use crate::notify::{JobNotificationTracker, NotificationStatus};

#[derive(Debug, Clone)]
enum TrackerOp {
    Add(u8),
    Finish(u8),
    Fail(u8),
}

fn tracker_op_strategy() -> impl Strategy<Value = TrackerOp> {
    prop_oneof![
        (0u8..4).prop_map(TrackerOp::Add),
        (0u8..4).prop_map(TrackerOp::Finish),
        (0u8..4).prop_map(TrackerOp::Fail),
    ]
}

fn id(n: u8) -> String {
    format!("op-{}", n)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    // Each lifecycle observed for an id is [Pending], [Pending, Succeeded]
    // or [Pending, Failed]; a new Pending only follows a terminal event.
    #[test]
    fn prop_observed_lifecycles_are_valid(ops in prop::collection::vec(tracker_op_strategy(), 1..60)) {
        let tracker = JobNotificationTracker::new(8);
        let mut sub = tracker.subscribe();

        for op in ops {
            match op {
                TrackerOp::Add(n) => { let _ = tracker.add("work", Some(id(n))); }
                TrackerOp::Finish(n) => { tracker.finish(&id(n), None); }
                TrackerOp::Fail(n) => { tracker.fail(&id(n), None, None); }
            }
        }

        let mut last: HashMap<String, NotificationStatus> = HashMap::new();
        for event in sub.drain() {
            let previous = last.get(&event.id).copied();
            match event.status {
                NotificationStatus::Pending => {
                    prop_assert!(previous.map_or(true, |s| s.is_terminal()), "Pending reopened an unresolved id");
                }
                terminal => {
                    prop_assert_eq!(previous, Some(NotificationStatus::Pending), "{:?} without Pending", terminal);
                }
            }
            last.insert(event.id.clone(), event.status);
        }
    }

    // `add` fails with DuplicateId exactly when the id is still pending.
    #[test]
    fn prop_duplicate_id_iff_pending(ops in prop::collection::vec(tracker_op_strategy(), 1..60)) {
        let tracker = JobNotificationTracker::default();
        let mut pending: HashMap<String, bool> = HashMap::new();

        for op in ops {
            match op {
                TrackerOp::Add(n) => {
                    let is_pending = pending.get(&id(n)).copied().unwrap_or(false);
                    match tracker.add("work", Some(id(n))) {
                        Ok(_) => prop_assert!(!is_pending),
                        Err(OpsError::DuplicateId(dup)) => {
                            prop_assert!(is_pending);
                            prop_assert_eq!(dup, id(n));
                        }
                        Err(other) => prop_assert!(false, "unexpected error {:?}", other),
                    }
                    pending.insert(id(n), true);
                }
                TrackerOp::Finish(n) | TrackerOp::Fail(n) => {
                    let was_pending = pending.insert(id(n), false).unwrap_or(false);
                    let changed = match op {
                        TrackerOp::Finish(_) => tracker.finish(&id(n), None),
                        _ => tracker.fail(&id(n), None, None),
                    };
                    prop_assert_eq!(changed, was_pending);
                }
            }
        }

        let expected = pending.values().filter(|p| **p).count();
        prop_assert_eq!(tracker.pending_count(), expected);
    }
}
