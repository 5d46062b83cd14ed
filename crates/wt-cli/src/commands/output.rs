//! Rendering of reconciliation reports.

use std::io::Write;

use anyhow::Result;
use wt_core::{
    DeleteReason, EntryReport, EntryStatus, ReconcileReport, Segment, SegmentOutcome, Tally,
};

/// Writes one block per entry followed by the tally.
pub fn write_report<W: Write>(writer: &mut W, report: &ReconcileReport) -> Result<()> {
    if report.entries.is_empty() {
        writeln!(writer, "No entries in range.")?;
    }
    for entry in &report.entries {
        write_entry(writer, entry)?;
    }
    write_tally(writer, &report.tally())?;
    Ok(())
}

/// Writes the report as a single JSON document.
pub fn write_report_json<W: Write>(writer: &mut W, report: &ReconcileReport) -> Result<()> {
    let output = serde_json::json!({
        "tally": report.tally(),
        "success": report.is_success(),
        "entries": report.entries,
    });
    writeln!(writer, "{}", serde_json::to_string_pretty(&output)?)?;
    Ok(())
}

fn write_entry<W: Write>(writer: &mut W, entry: &EntryReport) -> Result<()> {
    let label = match &entry.status {
        EntryStatus::Unchanged => "ok",
        EntryStatus::Deleted { .. } => "deleted",
        EntryStatus::Replaced { .. } => "replaced",
        EntryStatus::Planned { .. } => "plan",
        EntryStatus::Skipped { .. } => "skipped",
        EntryStatus::Failed { .. } => "FAILED",
        EntryStatus::PartiallyFailed { .. } => "PARTIAL",
    };
    write!(writer, "[{label}] {}", entry.entry_id)?;
    if let Some(source) = &entry.source {
        write!(writer, " {source}")?;
    }
    match entry.description.as_deref() {
        Some(description) if !description.is_empty() => writeln!(writer, " {description:?}")?,
        _ => writeln!(writer)?,
    }

    match &entry.status {
        EntryStatus::Unchanged => {}
        EntryStatus::Deleted {
            reason,
            already_gone,
        } => {
            write!(writer, "    removed: {}", describe_reason(*reason))?;
            if *already_gone {
                write!(writer, " (already gone)")?;
            }
            writeln!(writer)?;
        }
        EntryStatus::Replaced {
            created,
            already_gone,
        } => {
            if *already_gone {
                writeln!(writer, "    original was already gone")?;
            }
            for segment in created {
                writeln!(writer, "    created {} ({})", segment.interval, segment.id)?;
            }
        }
        EntryStatus::Planned { outcome } => match outcome {
            SegmentOutcome::Delete { reason } => {
                writeln!(writer, "    would remove: {}", describe_reason(*reason))?;
            }
            SegmentOutcome::Replace { segments } => {
                for segment in segments {
                    writeln!(writer, "    would create {}", segment.interval)?;
                }
            }
            SegmentOutcome::Keep { segment } => {
                writeln!(writer, "    would recreate {} unchanged", segment.interval)?;
            }
        },
        EntryStatus::Skipped { reason } | EntryStatus::Failed { reason } => {
            writeln!(writer, "    {reason}")?;
        }
        EntryStatus::PartiallyFailed {
            created,
            missing,
            errors,
        } => {
            writeln!(
                writer,
                "    original deleted, {} of {} segments created",
                created.len(),
                created.len() + missing.len()
            )?;
            for segment in created {
                writeln!(writer, "    created {} ({})", segment.interval, segment.id)?;
            }
            for segment in missing {
                writeln!(writer, "    MISSING {}", describe_missing(segment))?;
            }
            for error in errors {
                writeln!(writer, "    error: {error}")?;
            }
        }
    }
    Ok(())
}

fn write_tally<W: Write>(writer: &mut W, tally: &Tally) -> Result<()> {
    writeln!(
        writer,
        "Processed {} entries: {} unchanged, {} replaced, {} deleted, {} planned, {} skipped, {} failed, {} partially failed",
        tally.total(),
        tally.unchanged,
        tally.replaced,
        tally.deleted,
        tally.planned,
        tally.skipped,
        tally.failed,
        tally.partially_failed
    )?;
    Ok(())
}

const fn describe_reason(reason: DeleteReason) -> &'static str {
    match reason {
        DeleteReason::Weekend => "weekend",
        DeleteReason::FullyExcluded => "entirely inside excluded hours",
    }
}

/// Everything needed to recreate a lost segment by hand.
fn describe_missing(segment: &Segment) -> String {
    let metadata = &segment.metadata;
    let project = metadata
        .project_id
        .as_ref()
        .map_or_else(|| "-".to_string(), ToString::to_string);
    let tags = if metadata.tag_ids.is_empty() {
        "-".to_string()
    } else {
        metadata
            .tag_ids
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",")
    };
    format!(
        "{} {:?} project={project} tags={tags}",
        segment.interval, metadata.description
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::NaiveDateTime;
    use chrono_tz::Europe::Paris;
    use insta::assert_snapshot;
    use wt_core::{CreatedSegment, EntryId, EntryMetadata, ProjectId, TagId, TimeInterval};

    fn span(start: &str, end: &str) -> TimeInterval {
        let at = |s: &str| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap();
        TimeInterval::new(at(start), at(end), Paris).unwrap()
    }

    fn segment(start: &str, end: &str) -> Segment {
        Segment {
            interval: span(start, end),
            metadata: EntryMetadata {
                description: "Sprint work".to_string(),
                project_id: Some(ProjectId::new("project-1").unwrap()),
                tag_ids: vec![TagId::new("tag-1").unwrap(), TagId::new("tag-2").unwrap()],
                billable: false,
            },
        }
    }

    fn created(id: &str, start: &str, end: &str) -> CreatedSegment {
        CreatedSegment {
            id: EntryId::new(id).unwrap(),
            interval: span(start, end),
        }
    }

    fn report(id: &str, source: Option<TimeInterval>, status: EntryStatus) -> EntryReport {
        EntryReport {
            entry_id: id.to_string(),
            description: Some("Sprint work".to_string()),
            source,
            status,
        }
    }

    fn sample_report() -> ReconcileReport {
        ReconcileReport {
            entries: vec![
                report(
                    "e1",
                    Some(span("2025-01-28 09:15", "2025-01-28 11:45")),
                    EntryStatus::Unchanged,
                ),
                report(
                    "e2",
                    Some(span("2025-01-27 18:00", "2025-01-28 10:00")),
                    EntryStatus::Replaced {
                        created: vec![
                            created("n1", "2025-01-27 18:00", "2025-01-27 20:00"),
                            created("n2", "2025-01-28 09:00", "2025-01-28 10:00"),
                        ],
                        already_gone: false,
                    },
                ),
                report(
                    "e3",
                    Some(span("2025-01-25 10:00", "2025-01-25 11:00")),
                    EntryStatus::Deleted {
                        reason: DeleteReason::Weekend,
                        already_gone: true,
                    },
                ),
                report(
                    "e4",
                    None,
                    EntryStatus::Skipped {
                        reason: "entry e4 has no end".to_string(),
                    },
                ),
                report(
                    "e5",
                    Some(span("2025-01-28 11:45", "2025-01-28 12:45")),
                    EntryStatus::PartiallyFailed {
                        created: vec![created("n3", "2025-01-28 11:45", "2025-01-28 12:00")],
                        missing: vec![segment("2025-01-28 12:30", "2025-01-28 12:45")],
                        errors: vec![
                            "Tue 2025-01-28 12:30..12:45: rate limited by the time-tracking API"
                                .to_string(),
                        ],
                    },
                ),
            ],
        }
    }

    #[test]
    fn human_report_lists_every_entry_and_tally() {
        let mut output = Vec::new();
        write_report(&mut output, &sample_report()).unwrap();
        let output = String::from_utf8(output).unwrap();
        assert_snapshot!(output, @r#"
        [ok] e1 Tue 2025-01-28 09:15..11:45 "Sprint work"
        [replaced] e2 Mon 2025-01-27 18:00..Tue 2025-01-28 10:00 "Sprint work"
            created Mon 2025-01-27 18:00..20:00 (n1)
            created Tue 2025-01-28 09:00..10:00 (n2)
        [deleted] e3 Sat 2025-01-25 10:00..11:00 "Sprint work"
            removed: weekend (already gone)
        [skipped] e4 "Sprint work"
            entry e4 has no end
        [PARTIAL] e5 Tue 2025-01-28 11:45..12:45 "Sprint work"
            original deleted, 1 of 2 segments created
            created Tue 2025-01-28 11:45..12:00 (n3)
            MISSING Tue 2025-01-28 12:30..12:45 "Sprint work" project=project-1 tags=tag-1,tag-2
            error: Tue 2025-01-28 12:30..12:45: rate limited by the time-tracking API
        Processed 5 entries: 1 unchanged, 1 replaced, 1 deleted, 0 planned, 1 skipped, 0 failed, 1 partially failed
        "#);
    }

    #[test]
    fn dry_run_report_shows_plans() {
        let report = ReconcileReport {
            entries: vec![
                report(
                    "e1",
                    Some(span("2025-01-28 11:45", "2025-01-28 12:45")),
                    EntryStatus::Planned {
                        outcome: SegmentOutcome::Replace {
                            segments: vec![
                                segment("2025-01-28 11:45", "2025-01-28 12:00"),
                                segment("2025-01-28 12:30", "2025-01-28 12:45"),
                            ],
                        },
                    },
                ),
                report(
                    "e2",
                    Some(span("2025-01-28 20:30", "2025-01-28 23:00")),
                    EntryStatus::Planned {
                        outcome: SegmentOutcome::Delete {
                            reason: DeleteReason::FullyExcluded,
                        },
                    },
                ),
                report(
                    "e3",
                    Some(span("2025-01-28 09:15", "2025-01-28 11:00")),
                    EntryStatus::Planned {
                        outcome: SegmentOutcome::Keep {
                            segment: segment("2025-01-28 09:15", "2025-01-28 11:00"),
                        },
                    },
                ),
            ],
        };
        let mut output = Vec::new();
        write_report(&mut output, &report).unwrap();
        let output = String::from_utf8(output).unwrap();
        assert_snapshot!(output, @r#"
        [plan] e1 Tue 2025-01-28 11:45..12:45 "Sprint work"
            would create Tue 2025-01-28 11:45..12:00
            would create Tue 2025-01-28 12:30..12:45
        [plan] e2 Tue 2025-01-28 20:30..23:00 "Sprint work"
            would remove: entirely inside excluded hours
        [plan] e3 Tue 2025-01-28 09:15..11:00 "Sprint work"
            would recreate Tue 2025-01-28 09:15..11:00 unchanged
        Processed 3 entries: 0 unchanged, 0 replaced, 0 deleted, 3 planned, 0 skipped, 0 failed, 0 partially failed
        "#);
    }

    #[test]
    fn empty_report_says_so() {
        let mut output = Vec::new();
        write_report(&mut output, &ReconcileReport::default()).unwrap();
        let output = String::from_utf8(output).unwrap();
        assert_eq!(
            output,
            "No entries in range.\nProcessed 0 entries: 0 unchanged, 0 replaced, 0 deleted, 0 planned, 0 skipped, 0 failed, 0 partially failed\n"
        );
    }

    #[test]
    fn json_report_carries_status_and_tally() {
        let mut output = Vec::new();
        write_report_json(&mut output, &sample_report()).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&output).unwrap();

        assert_eq!(value["success"], false);
        assert_eq!(value["tally"]["partially_failed"], 1);
        assert_eq!(value["entries"][1]["status"], "replaced");
        assert_eq!(value["entries"][1]["created"][0]["id"], "n1");
        assert_eq!(value["entries"][4]["status"], "partially_failed");
        assert_eq!(
            value["entries"][4]["missing"][0]["interval"]["start"],
            "2025-01-28T12:30:00"
        );
        assert_eq!(
            value["entries"][4]["missing"][0]["metadata"]["tag_ids"][1],
            "tag-2"
        );
    }
}
