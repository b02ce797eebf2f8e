//! Handlebars templates, embedded at compile time.

use crate::error::{AttendanceError, ErrorKind};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use handlebars::{Handlebars, TemplateError};
use serde_json::{Value, json};

const PARTIALS: [(&str, &str); 2] = [
    ("header", include_str!("../../templates/partials/header.hbs")),
    ("footer", include_str!("../../templates/partials/footer.hbs")),
];

const TEMPLATES: [(&str, &str); 8] = [
    ("home", include_str!("../../templates/home.hbs")),
    ("import_students", include_str!("../../templates/import_students.hbs")),
    ("attendance_list", include_str!("../../templates/attendance_list.hbs")),
    ("take_attendance", include_str!("../../templates/take_attendance.hbs")),
    ("attendance_complete", include_str!("../../templates/attendance_complete.hbs")),
    ("print_absentees", include_str!("../../templates/print_absentees.hbs")),
    ("absentees_list", include_str!("../../templates/absentees_list.hbs")),
    ("error", include_str!("../../templates/error.hbs")),
];

pub struct Pages {
    registry: Handlebars<'static>,
}

impl Pages {
    pub fn new() -> Result<Self, TemplateError> {
        let mut registry = Handlebars::new();

        for (name, source) in PARTIALS {
            registry.register_partial(name, source)?;
        }
        for (name, source) in TEMPLATES {
            registry.register_template_string(name, source)?;
        }

        Ok(Self { registry })
    }

    pub fn render(&self, template: &str, context: &Value) -> Response {
        self.render_with_status(StatusCode::OK, template, context)
    }

    fn render_with_status(&self, status: StatusCode, template: &str, context: &Value) -> Response {
        match self.registry.render(template, context) {
            Ok(body) => (status, Html(body)).into_response(),
            Err(err) => {
                log::error!("Failed to render {}: {}", template, err);
                (StatusCode::INTERNAL_SERVER_ERROR, "Failed to render page").into_response()
            }
        }
    }

    /// Renders `err` as an error page with a status code matching its kind.
    pub fn error(&self, err: &AttendanceError, flash: Value) -> Response {
        let (status, message) = match err.kind() {
            ErrorKind::BadInput => (StatusCode::BAD_REQUEST, err.to_string()),
            ErrorKind::NotFound => (StatusCode::NOT_FOUND, err.to_string()),
            ErrorKind::Internal => {
                log::error!("{}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Something went wrong, please try again".to_string(),
                )
            }
        };

        let context = json!({
            "title": status.canonical_reason().unwrap_or("Error"),
            "status": status.as_u16(),
            "message": message,
            "flash": flash,
        });
        self.render_with_status(status, "error", &context)
    }
}
