//! This module contains the command-line interface [`Cli`] parser for running the attendance
//! server and administering the roster.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::DEFAULT_CONFIG_FILE;

/// The command line configuration struct, where the command-line interface parser is automatically
/// derived by [`clap::Parser`].
#[derive(Parser, Debug)]
#[command(name = "rollcall", about = "Daily student attendance register")]
pub struct Cli {
    /// Configuration file to read, with or without its extension.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    pub config: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the web server.
    Serve,

    /// Import students from a CSV or Excel roster.
    Import { file_path: PathBuf },

    /// Show the roster, optionally filtered by name, roll number, or course.
    Roster {
        #[arg(short, long)]
        search: Option<String>,
    },

    /// Show the absentees for a day (today by default).
    Absentees {
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },

    /// Remove a student, and all of their absences, from the roster.
    RemoveStudent { roll_number: String },
}
