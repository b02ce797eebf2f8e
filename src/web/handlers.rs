use super::SharedState;
use super::flash::{self, Flash};
use crate::error::{AttendanceError, ErrorKind, Result};
use crate::models::{Absence, AttendanceAction, Student};
use crate::roster;
use axum::extract::multipart::MultipartError;
use axum::extract::{Form, Multipart, Query, State};
use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::CookieJar;
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{Value, json};

const IMPORT_PATH: &str = "/import-students/";
const WALK_PATH: &str = "/take-attendance/";
const COMPLETE_PATH: &str = "/attendance-complete/";

/// The multipart field the import form posts the roster under.
const UPLOAD_FIELD: &str = "excel_file";

/// Renders `template` with `context`, or the error page if building the context failed. Any
/// pending flash message is consumed and shown.
fn page(state: &SharedState, jar: CookieJar, template: &str, context: Result<Value>) -> Response {
    let (jar, flash) = flash::take(jar);
    let flash = json!(flash);

    let body = match context {
        Ok(mut context) => {
            if let Some(fields) = context.as_object_mut() {
                fields.insert("flash".into(), flash);
            }
            state.pages.render(template, &context)
        }
        Err(err) => state.pages.error(&err, flash),
    };

    (jar, body).into_response()
}

fn redirect_with(jar: CookieJar, flash: Flash, to: &str) -> Response {
    (flash::set(jar, flash), Redirect::to(to)).into_response()
}

fn absentee_json(absence: &Absence, student: &Student) -> Value {
    json!({
        "roll_number": student.roll_number,
        "student_name": student.student_name,
        "course_name": student.course_name,
        "recorded_at": absence.date_time.format("%H:%M").to_string(),
    })
}

/// Parses a cursor position. A missing or empty value means the start of the roster.
fn parse_index(raw: Option<&str>) -> Result<usize> {
    match raw.map(str::trim) {
        None | Some("") => Ok(0),
        Some(raw) => raw
            .parse()
            .map_err(|_| AttendanceError::InvalidIndex(raw.to_string())),
    }
}

pub async fn home(State(state): State<SharedState>, jar: CookieJar) -> Response {
    page(&state, jar, "home", Ok(json!({ "title": "Attendance" })))
}

pub async fn import_form(State(state): State<SharedState>, jar: CookieJar) -> Response {
    page(
        &state,
        jar,
        "import_students",
        Ok(json!({
            "title": "Import Students",
            "required_columns": crate::error::REQUIRED_COLUMNS,
        })),
    )
}

struct Upload {
    filename: String,
    bytes: Vec<u8>,
}

fn multipart_error(err: MultipartError) -> AttendanceError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AttendanceError::UploadTooLarge
    } else {
        AttendanceError::Spreadsheet(err.to_string())
    }
}

async fn read_upload(multipart: &mut Multipart) -> Result<Upload> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field.bytes().await.map_err(multipart_error)?;

        if filename.is_empty() && bytes.is_empty() {
            break;
        }
        return Ok(Upload {
            filename,
            bytes: bytes.to_vec(),
        });
    }

    Err(AttendanceError::MissingUpload)
}

pub async fn import_upload(
    State(state): State<SharedState>,
    jar: CookieJar,
    mut multipart: Multipart,
) -> Response {
    let result = match read_upload(&mut multipart).await {
        Ok(upload) => roster::parse_roster(&upload.filename, &upload.bytes)
            .and_then(|rows| state.with_manager(|manager| manager.import_students(&rows))),
        Err(err) => Err(err),
    };

    match result {
        Ok(summary) => redirect_with(
            jar,
            Flash::success(format!(
                "Successfully imported {} students",
                summary.created
            )),
            "/attendance-list/",
        ),
        Err(err) => {
            if err.kind() == ErrorKind::Internal {
                log::error!("Roster import failed: {}", err);
            } else {
                log::warn!("Rejected roster upload: {}", err);
            }
            redirect_with(jar, Flash::error(err.to_string()), IMPORT_PATH)
        }
    }
}

pub async fn attendance_list(State(state): State<SharedState>, jar: CookieJar) -> Response {
    let today = state.today();

    let context = state
        .with_manager(|manager| manager.roster_status(today))
        .map(|rows| {
            let total_absent = rows.iter().filter(|row| row.is_absent).count();
            json!({
                "title": "Attendance List",
                "date": today.format("%Y-%m-%d").to_string(),
                "total_students": rows.len(),
                "total_absent": total_absent,
                "students_with_status": rows,
            })
        });

    page(&state, jar, "attendance_list", context)
}

#[derive(Debug, Deserialize)]
pub struct WalkQuery {
    index: Option<String>,
}

/// One step of the attendance walk.
struct WalkStep {
    student: Student,
    total: usize,
    is_absent: bool,
}

pub async fn take_attendance(
    State(state): State<SharedState>,
    jar: CookieJar,
    Query(query): Query<WalkQuery>,
) -> Response {
    let index = match parse_index(query.index.as_deref()) {
        Ok(index) => index,
        Err(err) => return redirect_with(jar, Flash::error(err.to_string()), WALK_PATH),
    };
    let today = state.today();

    let step = state.with_manager(|manager| {
        let total = manager.num_students()?;
        if index >= total {
            return Ok(None);
        }

        match manager.student_at(index)? {
            Some(student) => {
                let is_absent = manager.is_absent(student.id, today)?;
                Ok(Some(WalkStep {
                    student,
                    total,
                    is_absent,
                }))
            }
            None => Ok(None),
        }
    });

    let step = match step {
        Ok(Some(step)) => step,
        Ok(None) => return Redirect::to(COMPLETE_PATH).into_response(),
        Err(err) => return page(&state, jar, "take_attendance", Err(err)),
    };

    let progress = (index + 1) as f64 / step.total as f64 * 100.0;
    let context = json!({
        "title": "Take Attendance",
        "date": today.format("%Y-%m-%d").to_string(),
        "current_student": step.student,
        "current_index": index,
        "position": index + 1,
        "total_students": step.total,
        "progress": format!("{:.1}", progress),
        "is_absent_today": step.is_absent,
        "has_previous": index > 0,
        "previous_index": index.saturating_sub(1),
    });

    page(&state, jar, "take_attendance", Ok(context))
}

#[derive(Debug, Deserialize)]
pub struct MarkForm {
    student_id: Option<String>,
    action: Option<String>,
    current_index: Option<String>,
}

pub async fn mark_attendance(
    State(state): State<SharedState>,
    jar: CookieJar,
    Form(form): Form<MarkForm>,
) -> Response {
    let raw_id = form.student_id.unwrap_or_default();
    let action = AttendanceAction::from_form_value(form.action.as_deref().unwrap_or_default());
    // A mangled cursor restarts the walk; one at the very end finishes it.
    let next = match parse_index(form.current_index.as_deref()) {
        Ok(index) => match index.checked_add(1) {
            Some(next) => format!("{}?index={}", WALK_PATH, next),
            None => COMPLETE_PATH.to_string(),
        },
        Err(_) => WALK_PATH.to_string(),
    };
    let today = state.today();

    let result = raw_id
        .trim()
        .parse::<i32>()
        .map_err(|_| AttendanceError::StudentNotFound(raw_id.clone()))
        .and_then(|student_id| {
            state.with_manager(|manager| manager.record(student_id, today, action))
        });

    match result {
        Ok(()) => Redirect::to(&next).into_response(),
        Err(err) => page(&state, jar, "error", Err(err)),
    }
}

pub async fn mark_redirect() -> Redirect {
    Redirect::to(WALK_PATH)
}

pub async fn attendance_complete(State(state): State<SharedState>, jar: CookieJar) -> Response {
    let today = state.today();

    let context = state
        .with_manager(|manager| manager.recent_absences(today))
        .map(|absences| {
            let absent_students: Vec<Value> = absences
                .iter()
                .map(|(absence, student)| absentee_json(absence, student))
                .collect();
            json!({
                "title": "Attendance Complete",
                "date": today.format("%Y-%m-%d").to_string(),
                "total_absent": absent_students.len(),
                "absent_students": absent_students,
            })
        });

    page(&state, jar, "attendance_complete", context)
}

pub async fn print_absentees(State(state): State<SharedState>, jar: CookieJar) -> Response {
    let today = state.today();

    let context = state.with_manager(|manager| {
        let absences = manager.absentees_by_roll(today)?;
        let summary = manager.daily_summary(today)?;

        let absent_students: Vec<Value> = absences
            .iter()
            .map(|(absence, student)| absentee_json(absence, student))
            .collect();

        Ok(json!({
            "title": "Absentees Report",
            "date": today.format("%Y-%m-%d").to_string(),
            "absent_students": absent_students,
            "total_students": summary.total_students,
            "total_absent": summary.total_absent,
            "total_present": summary.total_present,
            "attendance_percentage": format!("{:.2}", summary.attendance_percentage),
        }))
    });

    page(&state, jar, "print_absentees", context)
}

#[derive(Debug, Deserialize)]
pub struct DateQuery {
    date: Option<String>,
}

pub async fn absentees_list(
    State(state): State<SharedState>,
    jar: CookieJar,
    Query(query): Query<DateQuery>,
) -> Response {
    let requested = query.date.as_deref().map(str::trim).filter(|raw| !raw.is_empty());

    let date = match requested {
        None => Ok(state.today()),
        Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map_err(|_| AttendanceError::InvalidDate(raw.to_string())),
    };

    let context = match date {
        Ok(date) => state
            .with_manager(|manager| manager.absentees_by_roll(date))
            .map(|absences| {
                let absent_students: Vec<Value> = absences
                    .iter()
                    .map(|(absence, student)| absentee_json(absence, student))
                    .collect();
                json!({
                    "title": "Absentees",
                    "filter_date": date.format("%Y-%m-%d").to_string(),
                    "total_absent": absent_students.len(),
                    "absent_students": absent_students,
                })
            }),
        // An unreadable date shows an empty list rather than an error page.
        Err(err) => Ok(json!({
            "title": "Absentees",
            "filter_date": requested.unwrap_or_default(),
            "total_absent": 0,
            "absent_students": [],
            "date_error": err.to_string(),
        })),
    };

    page(&state, jar, "absentees_list", context)
}

pub async fn not_found(State(state): State<SharedState>, jar: CookieJar, uri: Uri) -> Response {
    let err = AttendanceError::PageNotFound(uri.path().to_string());
    page(&state, jar, "error", Err(err))
}
