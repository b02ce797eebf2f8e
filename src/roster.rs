//! Reading student rosters out of spreadsheets.
//!
//! A roster is any CSV or Excel file whose first row names the [`REQUIRED_COLUMNS`]. Parsing is
//! split in two: [`read_sheet`] turns the raw bytes into a [`RawSheet`] of trimmed strings, and
//! [`RawSheet::roster_rows`] validates the header row and extracts [`RosterRow`]s. Nothing here
//! touches the database.

use crate::error::{AttendanceError, REQUIRED_COLUMNS, Result};
use crate::models::RosterRow;
use calamine::{Data, Reader, open_workbook_auto_from_rs};
use std::io::Cursor;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpreadsheetFormat {
    Csv,
    /// Anything `calamine` can open: xlsx, xlsm, xls and ods.
    Workbook,
}

impl SpreadsheetFormat {
    /// Picks a parser from the file extension, ignoring case.
    pub fn from_filename(filename: &str) -> Result<Self> {
        let extension = Path::new(filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "csv" => Ok(SpreadsheetFormat::Csv),
            "xlsx" | "xlsm" | "xls" | "ods" => Ok(SpreadsheetFormat::Workbook),
            _ => Err(AttendanceError::UnsupportedFormat(extension)),
        }
    }
}

/// A header row plus data rows, every cell rendered as a trimmed string.
#[derive(Debug, Default)]
pub struct RawSheet {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawSheet {
    /// Returns the positions of the required columns, or the list of those that are missing.
    fn required_positions(&self) -> Result<[usize; 3]> {
        let position = |name: &str| self.headers.iter().position(|header| header == name);

        let missing: Vec<&'static str> = REQUIRED_COLUMNS
            .iter()
            .copied()
            .filter(|name| position(name).is_none())
            .collect();

        match (
            position(REQUIRED_COLUMNS[0]),
            position(REQUIRED_COLUMNS[1]),
            position(REQUIRED_COLUMNS[2]),
        ) {
            (Some(name), Some(roll), Some(course)) => Ok([name, roll, course]),
            _ => Err(AttendanceError::MissingColumns(missing)),
        }
    }

    /// Validates the header row and converts every non-blank row into a [`RosterRow`].
    ///
    /// Rows with a blank roll number are kept so the importer can count them as skipped.
    pub fn roster_rows(&self) -> Result<Vec<RosterRow>> {
        let [name_col, roll_col, course_col] = self.required_positions()?;
        let cell = |row: &[String], col: usize| row.get(col).cloned().unwrap_or_default();

        Ok(self
            .rows
            .iter()
            .filter(|row| row.iter().any(|value| !value.is_empty()))
            .map(|row| RosterRow {
                student_name: cell(row, name_col),
                roll_number: cell(row, roll_col),
                course_name: cell(row, course_col),
            })
            .collect())
    }
}

/// Parses the bytes of an uploaded spreadsheet.
pub fn read_sheet(format: SpreadsheetFormat, bytes: &[u8]) -> Result<RawSheet> {
    match format {
        SpreadsheetFormat::Csv => read_csv(bytes),
        SpreadsheetFormat::Workbook => read_workbook(bytes),
    }
}

fn read_csv(bytes: &[u8]) -> Result<RawSheet> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(bytes);

    let headers = reader
        .headers()?
        .iter()
        .map(|header| header.trim_start_matches('\u{feff}').to_string())
        .collect();

    let mut rows: Vec<Vec<String>> = Vec::new();
    for record in reader.records() {
        rows.push(record?.iter().map(str::to_string).collect());
    }

    Ok(RawSheet { headers, rows })
}

fn read_workbook(bytes: &[u8]) -> Result<RawSheet> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))?;

    let range = match workbook.worksheet_range_at(0) {
        Some(range) => range?,
        None => return Err(AttendanceError::Spreadsheet("workbook has no sheets".into())),
    };

    let mut rows = range
        .rows()
        .map(|row| row.iter().map(cell_to_string).collect::<Vec<_>>());

    let headers = rows.next().unwrap_or_default();
    Ok(RawSheet {
        headers,
        rows: rows.collect(),
    })
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        // Roll numbers typed as numbers come back as floats; `101.0` should read `101`.
        Data::Float(value) if value.fract() == 0.0 && value.abs() < 1e15 => {
            format!("{}", *value as i64)
        }
        other => other.to_string().trim().to_string(),
    }
}

/// Reads a roster out of an uploaded file, picking the parser from `filename`.
pub fn parse_roster(filename: &str, bytes: &[u8]) -> Result<Vec<RosterRow>> {
    let format = SpreadsheetFormat::from_filename(filename)?;
    read_sheet(format, bytes)?.roster_rows()
}
