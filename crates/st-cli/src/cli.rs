//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use st_core::SleepQuality;

/// Sleep tracker.
///
/// Start a night when you go to bed, stop it when you get up, then rate how
/// well you slept.
#[derive(Debug, Parser)]
#[command(name = "sleeptrack", version, about, long_about = None)]
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
    /// Show whether a night is being tracked and what can be done next.
    Status,

    /// Start tracking tonight.
    Start,

    /// Stop tracking tonight.
    Stop {
        /// Rate the night right away (0-5 or very-bad, poor, so-so, ok, pretty-good, excellent).
        #[arg(short, long)]
        quality: Option<SleepQuality>,
    },

    /// Rate a finished night.
    Rate {
        /// The night ID, as shown by `list --json`.
        night: i64,

        /// Rating (0-5 or very-bad, poor, so-so, ok, pretty-good, excellent).
        quality: SleepQuality,
    },

    /// Show every recorded night.
    List {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Delete every recorded night.
    Clear,
}
