//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::commands::preview::PreviewArgs;
use crate::commands::reconcile::ReconcileArgs;
use crate::commands::split_lunch::SplitLunchArgs;

/// Keeps Clockify time entries inside working hours.
///
/// Removes weekend entries and cuts night and lunch time out of the rest,
/// replacing each entry with the pieces that remain.
#[derive(Debug, Parser)]
#[command(name = "wt", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Split or delete every entry of the lookback window that breaks the rules.
    Reconcile(ReconcileArgs),

    /// Cut the lunch break out of today's entries.
    SplitLunch(SplitLunchArgs),

    /// Show how one interval would be segmented, without contacting Clockify.
    Preview(PreviewArgs),

    /// List workspace projects.
    Projects {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },
}
