//! Reconcile recent Clockify entries against the exclusion rules.
//!
//! `wt reconcile` fetches every entry of the lookback window, splits each one
//! around weekends, nights and lunch, and replaces it at Clockify.

use std::io::Write;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use wt_clockify::Client;
use wt_core::{EntryStore, ExclusionRuleSet, ReconcileReport, Reconciler, RunMode};

use super::output::{write_report, write_report_json};
use super::util::{lookback_range, today_in};
use crate::Config;

#[derive(Debug, Args)]
pub struct ReconcileArgs {
    /// Days to look back from today (defaults to `lookback_days` in config).
    #[arg(long)]
    pub days: Option<u32>,

    /// Show what would change without deleting or creating anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Leave entries that already follow the rules untouched.
    #[arg(long)]
    pub skip_compliant: bool,

    /// Output as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Runs `wt reconcile`. Returns whether every entry was handled cleanly.
pub fn run<W: Write>(writer: &mut W, args: &ReconcileArgs, config: &Config) -> Result<bool> {
    let rules = config.rules()?;
    let days = args.days.unwrap_or(config.lookback_days);
    let (start, end) = lookback_range(today_in(config.timezone), days, config.timezone)?;
    tracing::info!(days, %start, %end, "reconciling lookback window");

    let client = Client::new(config.client_settings()?).context("failed to create Clockify client")?;
    let report = execute(
        &client,
        &rules,
        start,
        end,
        mode(args.dry_run),
        args.skip_compliant,
    )?;
    render(writer, &report, args.json)?;
    Ok(report.is_success())
}

pub(super) const fn mode(dry_run: bool) -> RunMode {
    if dry_run { RunMode::DryRun } else { RunMode::Apply }
}

/// Reconciles `[start, end]` against `store` on a fresh runtime.
pub(super) fn execute<S: EntryStore>(
    store: &S,
    rules: &ExclusionRuleSet,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    mode: RunMode,
    skip_compliant: bool,
) -> Result<ReconcileReport> {
    let reconciler = Reconciler::new(store, rules)
        .with_mode(mode)
        .skip_compliant(skip_compliant);
    let runtime = tokio::runtime::Runtime::new().context("failed to initialize tokio runtime")?;
    runtime
        .block_on(reconciler.run(start, end))
        .context("failed to fetch time entries")
}

pub(super) fn render<W: Write>(writer: &mut W, report: &ReconcileReport, json: bool) -> Result<()> {
    if json {
        write_report_json(writer, report)
    } else {
        write_report(writer, report)
    }
}
