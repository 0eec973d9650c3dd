//! Transcript state and interim/final reconciliation
//!
//! The store holds the append-only finalized sequence plus the single
//! interim caption; the reconciler folds the raw event stream into it under
//! the interim throttle policy.

mod reconciler;
mod store;

pub use reconciler::{Reconciler, TranscriptEvent, INTERIM_THROTTLE};
pub use store::{TimedSegment, TimedWord, TranscriptItem, TranscriptSnapshot, TranscriptStore};
