//! Reconciliation Functions
//!
//! Pure `(collection, operation, outcome) -> collection` transitions applied
//! once an operation reaches its terminal outcome.

use crate::error::Result;
use crate::ops::{EntryState, Identified, TrackedCollection};

// == Confirm Insert ==
/// Settles an optimistic insert made by `operation_id`.
///
/// On success the provisional entry is replaced, at the same position, by
/// the confirmed item the backend returned (its key may differ from the
/// provisional one). On failure the provisional entry is dropped.
pub fn confirm_insert<T: Identified>(
    mut collection: TrackedCollection<T>,
    operation_id: &str,
    outcome: &Result<T>,
) -> TrackedCollection<T>
where
    T: Clone,
{
    let position = collection
        .entries()
        .iter()
        .position(|e| is_provisional_for(&e.state, operation_id));
    collection.retain(|e| !is_provisional_for(&e.state, operation_id));

    if let Ok(item) = outcome {
        let index = position.unwrap_or(collection.len());
        collection.insert_confirmed_at(index, item.clone());
    }
    collection
}

// == Confirm Removal ==
/// Settles an optimistic removal made by `operation_id`: dropped on success,
/// restored to confirmed on failure.
pub fn confirm_removal<T: Identified, U>(
    mut collection: TrackedCollection<T>,
    operation_id: &str,
    outcome: &Result<U>,
) -> TrackedCollection<T> {
    if outcome.is_ok() {
        collection.retain(|e| !is_removing_for(&e.state, operation_id));
    } else {
        for entry in collection.entries_mut() {
            if is_removing_for(&entry.state, operation_id) {
                entry.state = EntryState::Confirmed;
            }
        }
    }
    collection
}

// == Remove On Success ==
/// Drops the entry for `key` only if the operation succeeded, e.g. a volume
/// that leaves the list once attached.
pub fn remove_on_success<T: Identified, U>(
    mut collection: TrackedCollection<T>,
    key: &T::Key,
    outcome: &Result<U>,
) -> TrackedCollection<T> {
    if outcome.is_ok() {
        collection.remove(key);
    }
    collection
}

// == Confirm Replace ==
/// Stores the item returned by a successful update; failures change nothing.
pub fn confirm_replace<T: Identified + Clone>(
    mut collection: TrackedCollection<T>,
    outcome: &Result<T>,
) -> TrackedCollection<T> {
    if let Ok(item) = outcome {
        collection.upsert(item.clone());
    }
    collection
}

fn is_provisional_for(state: &EntryState, operation_id: &str) -> bool {
    matches!(state, EntryState::Provisional { operation_id: op } if op == operation_id)
}

fn is_removing_for(state: &EntryState, operation_id: &str) -> bool {
    matches!(state, EntryState::Removing { operation_id: op } if op == operation_id)
}
