//! A daily attendance register: import a roster from a spreadsheet, walk through it marking
//! absences, and report on who was missing.

pub mod cli;
pub mod config;
pub mod display;
pub mod error;
pub mod manager;
pub mod models;
pub mod roster;
pub mod schema;
pub mod web;

use crate::manager::AttendanceManager;
use crate::models::ImportSummary;
use anyhow::Context;
use std::path::Path;

/// Imports the roster stored at `path` on disk.
pub fn import_roster_file(
    manager: &mut AttendanceManager,
    path: &Path,
) -> anyhow::Result<ImportSummary> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let filename = path.to_string_lossy();

    let rows = roster::parse_roster(&filename, &bytes)?;
    Ok(manager.import_students(&rows)?)
}
