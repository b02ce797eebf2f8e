use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use rollcall::cli::{Cli, Command};
use rollcall::config::Settings;
use rollcall::manager::AttendanceManager;
use rollcall::{display, web};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let settings = Settings::load(&cli.config).context("loading configuration")?;

    match cli.command {
        Command::Serve => web::serve(&settings).await,
        command => run_admin(command, &settings),
    }
}

/// Runs one of the roster administration commands against the configured database.
fn run_admin(command: Command, settings: &Settings) -> anyhow::Result<()> {
    let mut manager = AttendanceManager::connect(&settings.database.url)
        .with_context(|| format!("opening database {}", settings.database.url))?;

    match command {
        Command::Serve => {}
        Command::Import { file_path } => {
            let summary = rollcall::import_roster_file(&mut manager, &file_path)?;
            println!(
                "Successfully imported {} students ({} already on the roster, {} rows skipped)",
                summary.created, summary.existing, summary.skipped_rows
            );
        }
        Command::Roster { search } => {
            println!("{}", display::roster_table(&mut manager, search.as_deref())?);
        }
        Command::Absentees { date } => {
            let date = date.unwrap_or_else(|| Utc::now().date_naive());
            println!("{}", display::absentees_table(&mut manager, date)?);
        }
        Command::RemoveStudent { roll_number } => {
            let student = manager.delete_student(&roll_number)?;
            println!(
                "Removed {} - {} from the roster",
                student.roll_number, student.student_name
            );
        }
    }

    Ok(())
}
