//! Ops Module
//!
//! Tracked collections and the coordinator that drives an operation from
//! submission to reconciliation.

mod collection;
mod coordinator;
mod reconcile;


pub use collection::{EntryState, Identified, TrackedCollection, TrackedEntry};
pub use coordinator::{
    Operation, OperationCoordinator, OperationHandle, OperationMessages, OperationReport,
    Submission, Submit,
};
pub use reconcile::{confirm_insert, confirm_removal, confirm_replace, remove_on_success};
