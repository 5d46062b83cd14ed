//! Core domain logic for worktime.
//!
//! This crate contains:
//! - Intervals: half-open wall-clock ranges in one configured zone
//! - Rules: the weekend, night and lunch windows to strip from recorded work
//! - Segmentation: splitting one entry into its retained pieces
//! - Reconciliation: replacing entries at the provider, one at a time

mod entry;
mod interval;
mod reconcile;
mod rules;
mod segment;
mod types;

pub use entry::{EntryError, EntryMetadata, RawEntry, SourceEntry};
pub use interval::{IntervalError, TimeInterval, wall_clock_to_utc};
pub use reconcile::{
    CreatedSegment, DeleteStatus, EntryReport, EntryState, EntryStatus, EntryStore,
    ReconcileReport, Reconciler, RunMode, StoreError, Tally,
};
pub use rules::{DailyWindow, ExclusionRuleSet, RuleError};
pub use segment::{DeleteReason, Segment, SegmentOutcome, segment};
pub use types::{EntryId, IdError, ProjectId, TagId};
