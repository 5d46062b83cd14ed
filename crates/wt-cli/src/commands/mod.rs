//! CLI subcommand implementations.

pub mod output;
pub mod preview;
pub mod projects;
pub mod reconcile;
pub mod split_lunch;
pub mod util;
