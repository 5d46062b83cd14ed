//! Splitting an entry around exclusion windows.
//!
//! # Algorithm Summary
//!
//! 1. An entry that starts or ends on a weekend day is deleted outright.
//! 2. The interval is cut at midnight into one piece per calendar day.
//!    Weekend days in the middle contribute nothing.
//! 3. Each day piece loses the night window that began the previous evening
//!    and the one beginning that evening. What remains is daytime work.
//! 4. Each daytime piece loses the lunch window.
//! 5. Survivors inherit the source metadata and are returned in order.

use serde::Serialize;

use crate::entry::{EntryMetadata, SourceEntry};
use crate::interval::TimeInterval;
use crate::rules::ExclusionRuleSet;

/// A retained piece of an entry together with the metadata to record it under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Segment {
    pub interval: TimeInterval,
    pub metadata: EntryMetadata,
}

/// Why an entry is removed without replacement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteReason {
    /// Started or ended on a weekend day.
    Weekend,
    /// Every minute fell inside a night or lunch window.
    FullyExcluded,
}

/// What should happen to a source entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum SegmentOutcome {
    /// Already compliant; the single segment equals the source interval.
    Keep { segment: Segment },
    /// Replace the source with these segments, in chronological order.
    Replace { segments: Vec<Segment> },
    /// Remove the source and create nothing.
    Delete { reason: DeleteReason },
}

impl SegmentOutcome {
    /// The segments retained from the entry, empty when it is deleted.
    pub fn segments(&self) -> &[Segment] {
        match self {
            Self::Keep { segment } => std::slice::from_ref(segment),
            Self::Replace { segments } => segments,
            Self::Delete { .. } => &[],
        }
    }

    /// Consumes the outcome, yielding the segments to create.
    pub fn into_segments(self) -> Vec<Segment> {
        match self {
            Self::Keep { segment } => vec![segment],
            Self::Replace { segments } => segments,
            Self::Delete { .. } => Vec::new(),
        }
    }

    pub const fn is_delete(&self) -> bool {
        matches!(self, Self::Delete { .. })
    }
}

/// Computes the segments of `entry` that survive `rules`.
///
/// Pure: no I/O, and the entry is never modified.
pub fn segment(entry: &SourceEntry, rules: &ExclusionRuleSet) -> SegmentOutcome {
    let source = entry.interval();

    if rules.is_weekend(source.start().date()) || rules.is_weekend(source.end().date()) {
        return SegmentOutcome::Delete {
            reason: DeleteReason::Weekend,
        };
    }

    let intervals = retained_intervals(source, rules);
    match intervals.as_slice() {
        [] => SegmentOutcome::Delete {
            reason: DeleteReason::FullyExcluded,
        },
        [only] if only == source => SegmentOutcome::Keep {
            segment: Segment {
                interval: *only,
                metadata: entry.metadata().clone(),
            },
        },
        _ => SegmentOutcome::Replace {
            segments: intervals
                .into_iter()
                .map(|interval| Segment {
                    interval,
                    metadata: entry.metadata().clone(),
                })
                .collect(),
        },
    }
}

/// The daytime, non-lunch parts of `source`, in chronological order.
fn retained_intervals(source: &TimeInterval, rules: &ExclusionRuleSet) -> Vec<TimeInterval> {
    let mut retained = Vec::new();

    for day in source.days() {
        if rules.is_weekend(day) {
            tracing::debug!(%day, "skipping weekend day inside entry");
            continue;
        }
        let Some(day_part) = source.within_day(day) else {
            continue;
        };

        let windows = [
            day.pred_opt().and_then(|previous| rules.night_window_for(previous)),
            rules.night_window_for(day),
            rules.lunch_window_for(day),
        ];

        let mut pieces = vec![day_part];
        for window in windows.iter().flatten() {
            pieces = pieces
                .iter()
                .flat_map(|piece| piece.subtract(window))
                .collect();
        }

        if pieces.is_empty() {
            tracing::debug!(%day, "nothing left after exclusion windows");
        }
        retained.extend(pieces);
    }

    retained
}
