//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand};

use crate::record::ReminderInterval;

/// Save command arguments.
#[derive(Debug, Args)]
pub struct SaveCommand {
    /// Latitude of the spot in degrees
    #[arg(long, allow_negative_numbers = true)]
    pub lat: f64,

    /// Longitude of the spot in degrees
    #[arg(long, allow_negative_numbers = true)]
    pub lng: f64,

    /// Accuracy radius of the fix in meters
    #[arg(long, default_value = "0")]
    pub accuracy: f64,

    /// Photo of the spot (any common image format)
    #[arg(long, value_name = "FILE")]
    pub photo: Option<PathBuf>,

    /// Free-text note
    #[arg(short, long)]
    pub memo: Option<String>,

    /// Floor, e.g. "B2"
    #[arg(short, long)]
    pub floor: Option<String>,

    /// Zone, e.g. "C-14"
    #[arg(short, long)]
    pub zone: Option<String>,

    /// Reminder delay in minutes (30, 60, 120, 180 or 240; 0 for none)
    #[arg(short, long, value_name = "MINUTES", value_parser = parse_reminder)]
    pub remind: Option<ReminderArg>,

    /// Stay running until the reminder has fired
    #[arg(short, long, requires = "remind")]
    pub wait: bool,
}

impl SaveCommand {
    /// The requested reminder, if any.
    #[must_use]
    pub fn reminder(&self) -> Option<ReminderInterval> {
        self.remind.and_then(|arg| arg.0)
    }
}

/// A validated `--remind` value, where 0 means no reminder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReminderArg(pub Option<ReminderInterval>);

fn parse_reminder(value: &str) -> Result<ReminderArg, String> {
    let minutes: u32 = value
        .parse()
        .map_err(|_| format!("'{value}' is not a number of minutes"))?;
    ReminderInterval::from_minutes(minutes)
        .map(ReminderArg)
        .map_err(|e| e.to_string())
}

/// Show command arguments.
#[derive(Debug, Args)]
pub struct ShowCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// History command arguments.
#[derive(Debug, Args)]
pub struct HistoryCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,

    /// Maximum number of entries
    #[arg(short, long)]
    pub limit: Option<usize>,
}

/// Distance command arguments.
#[derive(Debug, Args)]
pub struct DistanceCommand {
    /// Your latitude in degrees
    #[arg(long, allow_negative_numbers = true)]
    pub lat: f64,

    /// Your longitude in degrees
    #[arg(long, allow_negative_numbers = true)]
    pub lng: f64,
}

/// Status command arguments.
#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        file: Option<PathBuf>,
    },
}
