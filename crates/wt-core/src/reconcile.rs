//! Applying segmentation results to the provider.
//!
//! Each entry walks a fixed sequence of states:
//!
//! ```text
//! Fetched -> Segmented -> DeletePending -> Deleted -> CreatePending(n) -> Created(n) -> Done
//! ```
//!
//! and stops at `Done` or `Failed`. The original is deleted only once its
//! segments are known, and replacements are created only once the delete has
//! gone through. Entries are handled strictly one after the other.
//!
//! An already compliant entry is deleted and recreated like any other unless
//! [`Reconciler::skip_compliant`] is set, in which case it is left alone.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::entry::{RawEntry, SourceEntry};
use crate::interval::TimeInterval;
use crate::rules::ExclusionRuleSet;
use crate::segment::{DeleteReason, Segment, SegmentOutcome, segment};
use crate::types::EntryId;

/// Log a progress line after this many entries.
const PROGRESS_EVERY: usize = 10;

/// Errors reported by an [`EntryStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// The provider is throttling requests.
    #[error("rate limited by the time-tracking API")]
    RateLimited,

    /// The credentials were rejected.
    #[error("time-tracking API rejected the credentials")]
    Unauthorized,

    /// Any other transport or API failure.
    #[error(transparent)]
    Backend(Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl StoreError {
    pub fn backend(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Backend(Box::new(err))
    }
}

/// Result of deleting an entry at the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteStatus {
    Deleted,
    /// The entry was already gone. Treated the same as a successful delete.
    NotFound,
}

/// The time-tracking record store the reconciler works against.
///
/// The scope (workspace, user) is fixed when the store is built.
#[allow(
    async_fn_in_trait,
    reason = "stores are awaited sequentially on one task, Send futures are not required"
)]
pub trait EntryStore {
    /// Lists entries whose interval lies within `[start, end]`, in provider order.
    async fn list_entries(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<RawEntry>, StoreError>;

    /// Deletes one entry.
    async fn delete_entry(&self, id: &EntryId) -> Result<DeleteStatus, StoreError>;

    /// Records a segment as a new entry and returns its identifier.
    async fn create_entry(&self, segment: &Segment) -> Result<EntryId, StoreError>;
}

/// Whether the reconciler modifies the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunMode {
    #[default]
    Apply,
    /// Compute and report segments without deleting or creating anything.
    DryRun,
}

/// Lifecycle of one entry during reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryState {
    Fetched,
    Segmented,
    DeletePending,
    Deleted,
    /// Creating the n-th segment (1-based).
    CreatePending(usize),
    /// n segments created so far.
    Created(usize),
    Done,
    Failed(String),
}

/// A replacement entry that was created successfully.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreatedSegment {
    pub id: EntryId,
    pub interval: TimeInterval,
}

/// Final status of one entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EntryStatus {
    /// Already compliant and left alone (only when skipping compliant entries).
    Unchanged,
    /// Removed without replacement.
    Deleted {
        reason: DeleteReason,
        already_gone: bool,
    },
    /// Removed and recreated as the listed segments.
    Replaced {
        created: Vec<CreatedSegment>,
        already_gone: bool,
    },
    /// Dry run: what would have been done.
    Planned { outcome: SegmentOutcome },
    /// Not processed because the record is malformed or invalid.
    Skipped { reason: String },
    /// The delete failed; the original entry is untouched.
    Failed { reason: String },
    /// The original is gone but some segments could not be created.
    ///
    /// `missing` lists exactly what has to be recreated by hand.
    PartiallyFailed {
        created: Vec<CreatedSegment>,
        missing: Vec<Segment>,
        errors: Vec<String>,
    },
}

/// Outcome of one entry, with enough context to print it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryReport {
    pub entry_id: String,
    pub description: Option<String>,
    pub source: Option<TimeInterval>,
    #[serde(flatten)]
    pub status: EntryStatus,
}

/// Counts of entry outcomes for the end-of-run tally.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Tally {
    pub unchanged: usize,
    pub replaced: usize,
    pub deleted: usize,
    pub planned: usize,
    pub skipped: usize,
    pub failed: usize,
    pub partially_failed: usize,
}

impl Tally {
    pub const fn total(&self) -> usize {
        self.unchanged
            + self.replaced
            + self.deleted
            + self.planned
            + self.skipped
            + self.failed
            + self.partially_failed
    }
}

/// Per-entry outcomes of a batch, in processing order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub entries: Vec<EntryReport>,
}

impl ReconcileReport {
    pub fn tally(&self) -> Tally {
        let mut tally = Tally::default();
        for entry in &self.entries {
            match entry.status {
                EntryStatus::Unchanged => tally.unchanged += 1,
                EntryStatus::Deleted { .. } => tally.deleted += 1,
                EntryStatus::Replaced { .. } => tally.replaced += 1,
                EntryStatus::Planned { .. } => tally.planned += 1,
                EntryStatus::Skipped { .. } => tally.skipped += 1,
                EntryStatus::Failed { .. } => tally.failed += 1,
                EntryStatus::PartiallyFailed { .. } => tally.partially_failed += 1,
            }
        }
        tally
    }

    /// True when no entry failed, fully or partially.
    pub fn is_success(&self) -> bool {
        let tally = self.tally();
        tally.failed == 0 && tally.partially_failed == 0
    }
}

/// Drives segmentation and delete-then-create for a batch of entries.
#[derive(Debug)]
pub struct Reconciler<'a, S> {
    store: &'a S,
    rules: &'a ExclusionRuleSet,
    mode: RunMode,
    skip_compliant: bool,
}

impl<'a, S: EntryStore> Reconciler<'a, S> {
    pub const fn new(store: &'a S, rules: &'a ExclusionRuleSet) -> Self {
        Self {
            store,
            rules,
            mode: RunMode::Apply,
            skip_compliant: false,
        }
    }

    #[must_use]
    pub const fn with_mode(mut self, mode: RunMode) -> Self {
        self.mode = mode;
        self
    }

    /// Leave entries that need no change untouched instead of recreating them.
    #[must_use]
    pub const fn skip_compliant(mut self, skip: bool) -> Self {
        self.skip_compliant = skip;
        self
    }

    /// Fetches the entries in `[start, end]` and reconciles each of them.
    ///
    /// Only a failure to list entries aborts the run; per-entry failures are
    /// recorded in the report.
    pub async fn run(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<ReconcileReport, StoreError> {
        let entries = self.store.list_entries(start, end).await?;
        tracing::info!(count = entries.len(), %start, %end, "fetched entries");
        Ok(self.reconcile_all(entries).await)
    }

    /// Reconciles entries one at a time, in the given order.
    pub async fn reconcile_all(&self, entries: Vec<RawEntry>) -> ReconcileReport {
        let total = entries.len();
        let mut reports = Vec::with_capacity(total);
        for (index, raw) in entries.into_iter().enumerate() {
            reports.push(self.reconcile_entry(raw).await);
            let processed = index + 1;
            if processed % PROGRESS_EVERY == 0 {
                tracing::info!(processed, total, "progress");
            }
        }
        tracing::info!(processed = total, "finished processing entries");
        ReconcileReport { entries: reports }
    }

    /// Reconciles a single entry.
    pub async fn reconcile_entry(&self, raw: RawEntry) -> EntryReport {
        let mut tracker = Tracker::new(raw.id.clone());
        let description = raw.description.clone();

        let entry = match SourceEntry::from_raw(raw, self.rules.timezone()) {
            Ok(entry) => entry,
            Err(err) => {
                tracing::warn!(entry = %tracker.id, error = %err, "skipping entry");
                let reason = err.to_string();
                tracker.advance(EntryState::Failed(reason.clone()));
                return tracker.report(description, None, EntryStatus::Skipped { reason });
            }
        };
        let source = Some(*entry.interval());
        tracing::info!(entry = %tracker.id, interval = %entry.interval(), "processing entry");

        let outcome = segment(&entry, self.rules);
        tracker.advance(EntryState::Segmented);

        if self.skip_compliant && matches!(outcome, SegmentOutcome::Keep { .. }) {
            tracker.advance(EntryState::Done);
            return tracker.report(description, source, EntryStatus::Unchanged);
        }
        if self.mode == RunMode::DryRun {
            tracker.advance(EntryState::Done);
            return tracker.report(description, source, EntryStatus::Planned { outcome });
        }

        tracker.advance(EntryState::DeletePending);
        let already_gone = match self.store.delete_entry(entry.id()).await {
            Ok(DeleteStatus::Deleted) => false,
            Ok(DeleteStatus::NotFound) => {
                tracing::info!(entry = %tracker.id, "entry already deleted");
                true
            }
            Err(err) => {
                tracing::error!(entry = %tracker.id, error = %err, "delete failed");
                let reason = format!("delete failed: {err}");
                tracker.advance(EntryState::Failed(reason.clone()));
                return tracker.report(description, source, EntryStatus::Failed { reason });
            }
        };
        tracker.advance(EntryState::Deleted);

        if let SegmentOutcome::Delete { reason } = outcome {
            tracker.advance(EntryState::Done);
            return tracker.report(
                description,
                source,
                EntryStatus::Deleted {
                    reason,
                    already_gone,
                },
            );
        }
        let segments = outcome.into_segments();

        let status = self.create_segments(&mut tracker, segments, already_gone).await;
        tracker.report(description, source, status)
    }

    async fn create_segments(
        &self,
        tracker: &mut Tracker,
        segments: Vec<Segment>,
        already_gone: bool,
    ) -> EntryStatus {
        let mut created = Vec::with_capacity(segments.len());
        let mut missing = Vec::new();
        let mut errors = Vec::new();

        for (index, segment) in segments.into_iter().enumerate() {
            tracker.advance(EntryState::CreatePending(index + 1));
            match self.store.create_entry(&segment).await {
                Ok(id) => {
                    tracing::info!(entry = %tracker.id, new_entry = %id, interval = %segment.interval, "created segment");
                    created.push(CreatedSegment {
                        id,
                        interval: segment.interval,
                    });
                    tracker.advance(EntryState::Created(created.len()));
                }
                Err(err) => {
                    tracing::error!(entry = %tracker.id, interval = %segment.interval, error = %err, "create failed after delete");
                    errors.push(format!("{}: {err}", segment.interval));
                    missing.push(segment);
                }
            }
        }

        if missing.is_empty() {
            tracker.advance(EntryState::Done);
            EntryStatus::Replaced {
                created,
                already_gone,
            }
        } else {
            tracker.advance(EntryState::Failed(format!(
                "{} of {} segments not created",
                missing.len(),
                missing.len() + created.len()
            )));
            EntryStatus::PartiallyFailed {
                created,
                missing,
                errors,
            }
        }
    }
}

/// Tracks and logs the state of one entry.
#[derive(Debug)]
struct Tracker {
    id: String,
    state: EntryState,
}

impl Tracker {
    const fn new(id: String) -> Self {
        Self {
            id,
            state: EntryState::Fetched,
        }
    }

    fn advance(&mut self, next: EntryState) {
        tracing::debug!(entry = %self.id, from = ?self.state, to = ?next, "entry state");
        self.state = next;
    }

    fn report(
        self,
        description: Option<String>,
        source: Option<TimeInterval>,
        status: EntryStatus,
    ) -> EntryReport {
        EntryReport {
            entry_id: self.id,
            description,
            source,
            status,
        }
    }
}
