use crate::error::{AttendanceError, Result};
use crate::models::{
    Absence, AttendanceAction, DailySummary, ImportSummary, NewAbsence, NewStudent, RosterRow,
    Student, StudentStatus,
};
use crate::schema;
use chrono::{NaiveDate, NaiveDateTime, Utc};
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use std::collections::HashSet;

/// Table definitions, kept in the diesel migrations directory and applied on every connect.
const SCHEMA_SQL: &str = include_str!("../migrations/2025-01-01-000000_create_attendance/up.sql");

/// Makes `%`, `_` and `\` match themselves inside a LIKE pattern that escapes with `\`.
fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// The manager for recording, modifying, and retrieving attendance data.
pub struct AttendanceManager {
    db: SqliteConnection,
}

impl AttendanceManager {
    /// Connects to the `sqlite3` database at `database_url`, creating the tables if they are
    /// missing. Pass `":memory:"` for a throwaway database.
    pub fn connect(database_url: &str) -> Result<Self> {
        let mut db = SqliteConnection::establish(database_url)?;

        // Foreign keys are off by default in SQLite, and the absence cascade depends on them.
        db.batch_execute("PRAGMA foreign_keys = ON;")?;
        db.batch_execute(SCHEMA_SQL)?;

        log::debug!("Connected to {}", database_url);
        Ok(Self { db })
    }

    /// Returns the total number of students on the roster.
    pub fn num_students(&mut self) -> Result<usize> {
        use schema::students::dsl::*;

        let count: i64 = students.count().get_result(&mut self.db)?;
        Ok(count as usize)
    }

    /// Retrieves all students on the roster in roll number order.
    pub fn roster(&mut self) -> Result<Vec<Student>> {
        use schema::students::dsl::*;

        Ok(students
            .order(roll_number.asc())
            .select(Student::as_select())
            .load(&mut self.db)?)
    }

    /// Returns the student at position `index` of the roll number ordered roster, if any.
    pub fn student_at(&mut self, index: usize) -> Result<Option<Student>> {
        use schema::students::dsl::*;

        Ok(students
            .order(roll_number.asc())
            .offset(index as i64)
            .select(Student::as_select())
            .first(&mut self.db)
            .optional()?)
    }

    /// Retrieves a specific student from the roster based on their ID.
    pub fn get_student(&mut self, student_id: i32) -> Result<Student> {
        use schema::students::dsl::*;

        students
            .find(student_id)
            .select(Student::as_select())
            .first(&mut self.db)
            .optional()?
            .ok_or_else(|| AttendanceError::StudentNotFound(student_id.to_string()))
    }

    /// Finds students whose name, roll number, or course contains `query`.
    pub fn search_students(&mut self, query: &str) -> Result<Vec<Student>> {
        use schema::students::dsl::*;

        // SQLite's LIKE is already case-insensitive for ASCII.
        let pattern = format!("%{}%", escape_like(query.trim()));

        Ok(students
            .filter(
                student_name
                    .like(pattern.as_str())
                    .escape('\\')
                    .or(roll_number.like(pattern.as_str()).escape('\\'))
                    .or(course_name.like(pattern.as_str()).escape('\\')),
            )
            .order(roll_number.asc())
            .select(Student::as_select())
            .load(&mut self.db)?)
    }

    /// Inserts every roster row whose roll number is not already present. Existing students are
    /// left untouched, so importing the same roster twice is harmless.
    pub fn import_students(&mut self, rows: &[RosterRow]) -> Result<ImportSummary> {
        let now = Utc::now().naive_utc();

        let summary = self.db.transaction::<_, diesel::result::Error, _>(|conn| {
            let mut summary = ImportSummary::default();

            for row in rows {
                if row.roll_number.is_empty() {
                    summary.skipped_rows += 1;
                    continue;
                }

                let inserted = diesel::insert_or_ignore_into(schema::students::table)
                    .values(NewStudent {
                        student_name: &row.student_name,
                        roll_number: &row.roll_number,
                        course_name: &row.course_name,
                        created_at: now,
                    })
                    .execute(conn)?;

                if inserted == 1 {
                    summary.created += 1;
                } else {
                    summary.existing += 1;
                }
            }

            Ok(summary)
        })?;

        log::info!(
            "Imported roster: {} created, {} already present, {} skipped",
            summary.created,
            summary.existing,
            summary.skipped_rows
        );

        Ok(summary)
    }

    /// Records that a student was absent on `date`. Returns `false` if they were already marked.
    pub fn mark_absent(
        &mut self,
        student_id: i32,
        date: NaiveDate,
        recorded_at: NaiveDateTime,
    ) -> Result<bool> {
        let student = self.get_student(student_id)?;

        let inserted = diesel::insert_or_ignore_into(schema::absences::table)
            .values(NewAbsence {
                student_id: student.id,
                absence_date: date,
                date_time: recorded_at,
            })
            .execute(&mut self.db)?;

        if inserted == 1 {
            log::info!("Marked {} absent on {}", student.roll_number, date);
        } else {
            log::debug!("{} was already marked absent on {}", student.roll_number, date);
        }
        Ok(inserted == 1)
    }

    /// Clears any absence for the student on `date`. Returns whether one was removed.
    pub fn mark_present(&mut self, student: i32, date: NaiveDate) -> Result<bool> {
        use schema::absences::dsl::*;

        let student = self.get_student(student)?;

        let removed = diesel::delete(
            absences
                .filter(student_id.eq(student.id))
                .filter(absence_date.eq(date)),
        )
        .execute(&mut self.db)?;

        if removed > 0 {
            log::info!("Marked {} present on {}", student.roll_number, date);
        }
        Ok(removed > 0)
    }

    /// Applies the operator's choice for one student.
    pub fn record(
        &mut self,
        student_id: i32,
        date: NaiveDate,
        action: AttendanceAction,
    ) -> Result<()> {
        match action {
            AttendanceAction::Absent => {
                self.mark_absent(student_id, date, Utc::now().naive_utc())?;
            }
            AttendanceAction::Present => {
                self.mark_present(student_id, date)?;
            }
        }
        Ok(())
    }

    pub fn is_absent(&mut self, student: i32, date: NaiveDate) -> Result<bool> {
        use schema::absences::dsl::*;

        let count: i64 = absences
            .filter(student_id.eq(student))
            .filter(absence_date.eq(date))
            .count()
            .get_result(&mut self.db)?;

        Ok(count > 0)
    }

    /// The IDs of every student with an absence on `date`.
    pub fn absent_student_ids(&mut self, date: NaiveDate) -> Result<HashSet<i32>> {
        use schema::absences::dsl::*;

        let ids: Vec<i32> = absences
            .filter(absence_date.eq(date))
            .select(student_id)
            .load(&mut self.db)?;

        Ok(ids.into_iter().collect())
    }

    /// The whole roster, each student flagged present or absent for `date`.
    pub fn roster_status(&mut self, date: NaiveDate) -> Result<Vec<StudentStatus>> {
        let absent = self.absent_student_ids(date)?;

        Ok(self
            .roster()?
            .into_iter()
            .enumerate()
            .map(|(index, student)| StudentStatus {
                sl_no: index + 1,
                is_absent: absent.contains(&student.id),
                student,
            })
            .collect())
    }

    /// Absences on `date` paired with their students, in roll number order.
    pub fn absentees_by_roll(&mut self, date: NaiveDate) -> Result<Vec<(Absence, Student)>> {
        use schema::absences::dsl::*;
        use schema::students::dsl::roll_number;

        Ok(absences
            .inner_join(schema::students::table)
            .filter(absence_date.eq(date))
            .order(roll_number.asc())
            .select((Absence::as_select(), Student::as_select()))
            .load(&mut self.db)?)
    }

    /// Absences on `date` paired with their students, most recently recorded first.
    pub fn recent_absences(&mut self, date: NaiveDate) -> Result<Vec<(Absence, Student)>> {
        use schema::absences::dsl::*;

        Ok(absences
            .inner_join(schema::students::table)
            .filter(absence_date.eq(date))
            .order((date_time.desc(), id.desc()))
            .select((Absence::as_select(), Student::as_select()))
            .load(&mut self.db)?)
    }

    pub fn daily_summary(&mut self, date: NaiveDate) -> Result<DailySummary> {
        use schema::absences::dsl::*;

        let total_students = self.num_students()?;
        let total_absent: i64 = absences
            .filter(absence_date.eq(date))
            .count()
            .get_result(&mut self.db)?;

        Ok(DailySummary::new(date, total_students, total_absent as usize))
    }

    /// Removes a student from the roster by roll number. Their absences go with them.
    pub fn delete_student(&mut self, roll: &str) -> Result<Student> {
        use schema::students::dsl::*;

        let removed = diesel::delete(students.filter(roll_number.eq(roll.trim())))
            .returning(Student::as_returning())
            .get_result(&mut self.db)
            .optional()?;

        match removed {
            Some(student) => {
                log::info!("Removed {} from the roster", student.roll_number);
                Ok(student)
            }
            None => Err(AttendanceError::StudentNotFound(roll.to_string())),
        }
    }
}
