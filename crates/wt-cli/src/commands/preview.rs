//! Offline segmentation of a single interval.
//!
//! `wt preview` answers "what would reconcile do to this entry?" without
//! touching Clockify, which makes it handy for checking rule configuration.

use std::io::Write;

use anyhow::{Context, Result};
use clap::Args;
use wt_core::{
    DeleteReason, EntryId, EntryMetadata, SegmentOutcome, SourceEntry, TimeInterval, segment,
};

use super::util::parse_datetime;
use crate::Config;

#[derive(Debug, Args)]
pub struct PreviewArgs {
    /// Entry start (RFC 3339 or "YYYY-MM-DD HH:MM" in the configured zone).
    #[arg(long)]
    pub start: String,

    /// Entry end (RFC 3339 or "YYYY-MM-DD HH:MM" in the configured zone).
    #[arg(long)]
    pub end: String,

    /// Description carried onto every segment.
    #[arg(long, default_value = "")]
    pub description: String,

    /// Apply only the lunch rule, as `wt split-lunch` does.
    #[arg(long)]
    pub lunch_only: bool,

    /// Output as JSON.
    #[arg(long)]
    pub json: bool,
}

pub fn run<W: Write>(writer: &mut W, args: &PreviewArgs, config: &Config) -> Result<()> {
    let rules = if args.lunch_only {
        config.lunch_rules()?
    } else {
        config.rules()?
    };
    let tz = config.timezone;
    let start = parse_datetime(&args.start, tz)?;
    let end = parse_datetime(&args.end, tz)?;
    let interval = TimeInterval::from_utc(start, end, tz).context("invalid interval")?;

    let entry = SourceEntry::new(
        EntryId::new("preview")?,
        interval,
        EntryMetadata {
            description: args.description.clone(),
            ..EntryMetadata::default()
        },
    );
    let outcome = segment(&entry, &rules);

    if args.json {
        let output = serde_json::json!({
            "source": interval,
            "outcome": outcome,
        });
        writeln!(writer, "{}", serde_json::to_string_pretty(&output)?)?;
    } else {
        write_outcome(writer, &interval, &outcome)?;
    }
    Ok(())
}

fn write_outcome<W: Write>(
    writer: &mut W,
    source: &TimeInterval,
    outcome: &SegmentOutcome,
) -> Result<()> {
    writeln!(writer, "{source} ({})", source.timezone())?;
    match outcome {
        SegmentOutcome::Keep { .. } => writeln!(writer, "  compliant, kept as is")?,
        SegmentOutcome::Delete { reason } => {
            let why = match reason {
                DeleteReason::Weekend => "touches a weekend day",
                DeleteReason::FullyExcluded => "entirely inside excluded hours",
            };
            writeln!(writer, "  deleted: {why}")?;
        }
        SegmentOutcome::Replace { segments } => {
            writeln!(writer, "  split into {} segments:", segments.len())?;
            for segment in segments {
                writeln!(writer, "    {}", segment.interval)?;
            }
        }
    }
    Ok(())
}
