//! Command-line interface for parkspot.
//!
//! This module provides the CLI structure for the `parkspot` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    ConfigCommand, DistanceCommand, HistoryCommand, ReminderArg, SaveCommand, ShowCommand,
    StatusCommand,
};

use crate::logging::Verbosity;

/// parkspot - Remember where you parked
///
/// Saves the spot where you left the car, with an optional photo, memo,
/// floor and zone, and reminds you to come back.
#[derive(Debug, Parser)]
#[command(name = "parkspot")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Save the current parking spot, replacing any previous one
    Save(SaveCommand),

    /// Show the current parking spot
    Show(ShowCommand),

    /// Delete the current parking spot
    Delete,

    /// List earlier parking spots, most recent first
    History(HistoryCommand),

    /// Print a navigation link to the current parking spot
    Directions,

    /// Distance from a position to the current parking spot
    Distance(DistanceCommand),

    /// Show storage status
    Status(StatusCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.verbose, self.quiet)
    }
}
