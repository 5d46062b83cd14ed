//! Worktime CLI library.
//!
//! This crate provides the `wt` command-line interface on top of
//! `wt-core` and `wt-clockify`.

mod cli;
pub mod commands;
mod config;

pub use cli::{Cli, Commands};
pub use config::Config;
