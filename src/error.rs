use std::fmt;

/// The columns every roster spreadsheet must provide.
pub const REQUIRED_COLUMNS: [&str; 3] = ["Student Name", "Roll Number", "Course Name"];

/// Broad classes of failure, used to pick a response for the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    BadInput,
    NotFound,
    Internal,
}

#[derive(Debug)]
pub enum AttendanceError {
    /// The uploaded file has an extension we cannot parse.
    UnsupportedFormat(String),
    /// The header row lacks one or more of [`REQUIRED_COLUMNS`].
    MissingColumns(Vec<&'static str>),
    /// The spreadsheet parser rejected the file.
    Spreadsheet(String),
    /// No file was attached to an import request.
    MissingUpload,
    /// The request body went over the configured upload limit.
    UploadTooLarge,
    InvalidDate(String),
    InvalidIndex(String),
    /// A student ID or roll number that is not on the roster.
    StudentNotFound(String),
    /// A request for a path the application does not serve.
    PageNotFound(String),
    Database(diesel::result::Error),
    Connection(diesel::ConnectionError),
}

impl AttendanceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AttendanceError::UnsupportedFormat(_)
            | AttendanceError::MissingColumns(_)
            | AttendanceError::Spreadsheet(_)
            | AttendanceError::MissingUpload
            | AttendanceError::UploadTooLarge
            | AttendanceError::InvalidDate(_)
            | AttendanceError::InvalidIndex(_) => ErrorKind::BadInput,
            AttendanceError::StudentNotFound(_) | AttendanceError::PageNotFound(_) => {
                ErrorKind::NotFound
            }
            AttendanceError::Database(diesel::result::Error::NotFound) => ErrorKind::NotFound,
            AttendanceError::Database(_) | AttendanceError::Connection(_) => ErrorKind::Internal,
        }
    }
}

impl fmt::Display for AttendanceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttendanceError::UnsupportedFormat(ext) => write!(
                f,
                "Unsupported file format '{}'. Please use .xlsx, .xls, or .csv files",
                ext
            ),
            AttendanceError::MissingColumns(missing) => write!(
                f,
                "Excel file must contain columns: {} (missing: {})",
                REQUIRED_COLUMNS.join(", "),
                missing.join(", ")
            ),
            AttendanceError::Spreadsheet(msg) => write!(f, "Error importing file: {}", msg),
            AttendanceError::MissingUpload => write!(f, "Please choose a file to import"),
            AttendanceError::UploadTooLarge => {
                write!(f, "The file is too large to import. Please upload a smaller file")
            }
            AttendanceError::InvalidDate(raw) => {
                write!(f, "'{}' is not a valid date, expected YYYY-MM-DD", raw)
            }
            AttendanceError::InvalidIndex(raw) => {
                write!(f, "'{}' is not a valid position in the roster", raw)
            }
            AttendanceError::StudentNotFound(id) => write!(f, "No student found for '{}'", id),
            AttendanceError::PageNotFound(path) => write!(f, "Invalid path: {}", path),
            AttendanceError::Database(err) => write!(f, "Database error: {}", err),
            AttendanceError::Connection(err) => write!(f, "Could not connect to database: {}", err),
        }
    }
}

impl std::error::Error for AttendanceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AttendanceError::Database(err) => Some(err),
            AttendanceError::Connection(err) => Some(err),
            _ => None,
        }
    }
}

impl From<diesel::result::Error> for AttendanceError {
    fn from(err: diesel::result::Error) -> Self {
        AttendanceError::Database(err)
    }
}

impl From<diesel::ConnectionError> for AttendanceError {
    fn from(err: diesel::ConnectionError) -> Self {
        AttendanceError::Connection(err)
    }
}

impl From<csv::Error> for AttendanceError {
    fn from(err: csv::Error) -> Self {
        AttendanceError::Spreadsheet(err.to_string())
    }
}

impl From<calamine::Error> for AttendanceError {
    fn from(err: calamine::Error) -> Self {
        AttendanceError::Spreadsheet(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AttendanceError>;
