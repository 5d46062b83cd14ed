//! Split today's entries around the lunch break only.

use std::io::Write;

use anyhow::{Context, Result};
use clap::Args;
use wt_clockify::Client;

use super::reconcile::{execute, mode, render};
use super::util::{lookback_range, today_in};
use crate::Config;

#[derive(Debug, Args)]
pub struct SplitLunchArgs {
    /// Show what would change without deleting or creating anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Leave entries that do not touch lunch untouched.
    #[arg(long)]
    pub skip_compliant: bool,

    /// Output as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Runs `wt split-lunch`. Weekends and nights are left alone.
pub fn run<W: Write>(writer: &mut W, args: &SplitLunchArgs, config: &Config) -> Result<bool> {
    let rules = config.lunch_rules()?;
    if rules.lunch().is_none() {
        anyhow::bail!("the lunch rule is disabled in the configuration");
    }
    let (start, end) = lookback_range(today_in(config.timezone), 0, config.timezone)?;
    tracing::info!(%start, %end, "splitting today's entries around lunch");

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
