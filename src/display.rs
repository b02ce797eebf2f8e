use crate::error::Result;
use crate::manager::AttendanceManager;
use chrono::NaiveDate;
use tabled::{Table, Tabled, settings::Style};

#[derive(Tabled)]
struct RosterLine {
    #[tabled(rename = "Roll Number")]
    roll_number: String,
    #[tabled(rename = "Student Name")]
    student_name: String,
    #[tabled(rename = "Course Name")]
    course_name: String,
}

#[derive(Tabled)]
struct AbsenteeLine {
    #[tabled(rename = "Roll Number")]
    roll_number: String,
    #[tabled(rename = "Student Name")]
    student_name: String,
    #[tabled(rename = "Recorded")]
    recorded: String,
}

/// Renders the roster, or the students matching `search`, as a table.
pub fn roster_table(manager: &mut AttendanceManager, search: Option<&str>) -> Result<String> {
    let students = match search {
        Some(query) => manager.search_students(query)?,
        None => manager.roster()?,
    };

    let lines: Vec<RosterLine> = students
        .into_iter()
        .map(|student| RosterLine {
            roll_number: student.roll_number,
            student_name: student.student_name,
            course_name: student.course_name,
        })
        .collect();

    let count = lines.len();
    let mut table = Table::new(lines);
    table.with(Style::modern());

    Ok(format!("Roster ({count} students):\n{table}"))
}

/// Renders the absentees for `date` followed by the day's totals.
pub fn absentees_table(manager: &mut AttendanceManager, date: NaiveDate) -> Result<String> {
    let lines: Vec<AbsenteeLine> = manager
        .absentees_by_roll(date)?
        .into_iter()
        .map(|(absence, student)| AbsenteeLine {
            roll_number: student.roll_number,
            student_name: student.student_name,
            recorded: absence.date_time.format("%H:%M").to_string(),
        })
        .collect();

    let summary = manager.daily_summary(date)?;

    let mut table = Table::new(lines);
    table.with(Style::modern());

    Ok(format!(
        "Absentees on {date}:\n{table}\nAbsent: {}  Present: {}  Attendance: {:.2}%",
        summary.total_absent, summary.total_present, summary.attendance_percentage
    ))
}
