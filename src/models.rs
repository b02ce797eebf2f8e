use crate::schema::{absences, students};
use chrono::{NaiveDate, NaiveDateTime};
use diesel::prelude::*;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Identifiable, Queryable, Selectable)]
#[diesel(table_name = students)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Student {
    pub id: i32,
    pub student_name: String,
    pub roll_number: String,
    pub course_name: String,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = students)]
pub struct NewStudent<'a> {
    pub student_name: &'a str,
    pub roll_number: &'a str,
    pub course_name: &'a str,
    pub created_at: NaiveDateTime,
}

/// A recorded absence. A student with no row for a date was present on that date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Identifiable, Queryable, Selectable, Associations)]
#[diesel(belongs_to(Student))]
#[diesel(table_name = absences)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Absence {
    pub id: i32,
    pub student_id: i32,
    pub absence_date: NaiveDate,
    pub date_time: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = absences)]
pub struct NewAbsence {
    pub student_id: i32,
    pub absence_date: NaiveDate,
    pub date_time: NaiveDateTime,
}

/// One line of an imported roster, already trimmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterRow {
    pub student_name: String,
    pub roll_number: String,
    pub course_name: String,
}

/// The outcome of importing a roster.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    /// Students that did not exist before this import.
    pub created: usize,
    /// Rows whose roll number was already on the roster.
    pub existing: usize,
    /// Rows dropped because the roll number was blank.
    pub skipped_rows: usize,
}

/// What the operator chose for a student on the attendance walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttendanceAction {
    Present,
    Absent,
}

impl AttendanceAction {
    /// Only `absent` marks a student absent; any other value counts as present.
    pub fn from_form_value(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("absent") {
            AttendanceAction::Absent
        } else {
            AttendanceAction::Present
        }
    }
}

/// A student annotated with their status on a given day.
#[derive(Debug, Clone, Serialize)]
pub struct StudentStatus {
    pub sl_no: usize,
    pub student: Student,
    pub is_absent: bool,
}

/// Headline numbers for a single day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DailySummary {
    pub date: NaiveDate,
    pub total_students: usize,
    pub total_absent: usize,
    pub total_present: usize,
    pub attendance_percentage: f64,
}

impl DailySummary {
    pub fn new(date: NaiveDate, total_students: usize, total_absent: usize) -> Self {
        let total_present = total_students.saturating_sub(total_absent);
        let attendance_percentage = if total_students > 0 {
            let raw = total_present as f64 / total_students as f64 * 100.0;
            (raw * 100.0).round() / 100.0
        } else {
            0.0
        };

        Self {
            date,
            total_students,
            total_absent,
            total_present,
            attendance_percentage,
        }
    }
}
