//! The HTTP surface: server-rendered pages for importing the roster, walking through it to take
//! attendance, and reporting on absentees.
//!
//! Every handler works against the single [`AttendanceManager`] held in [`AppState`]. The
//! connection sits behind a mutex, so requests touch the database one at a time.

mod flash;
mod handlers;
mod pages;

use crate::config::Settings;
use crate::error::Result;
use crate::manager::AttendanceManager;
use anyhow::Context;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use chrono::{NaiveDate, Utc};
use handlebars::TemplateError;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::net::TcpListener;

use pages::Pages;

pub type SharedState = Arc<AppState>;

pub struct AppState {
    manager: Mutex<AttendanceManager>,
    pages: Pages,
}

impl AppState {
    pub fn new(manager: AttendanceManager) -> std::result::Result<Self, TemplateError> {
        Ok(Self {
            manager: Mutex::new(manager),
            pages: Pages::new()?,
        })
    }

    /// Runs `f` with exclusive access to the database.
    fn with_manager<T>(&self, f: impl FnOnce(&mut AttendanceManager) -> Result<T>) -> Result<T> {
        let mut manager = self.manager.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut manager)
    }

    /// The day attendance is being taken for, in UTC.
    fn today(&self) -> NaiveDate {
        Utc::now().date_naive()
    }
}

/// Builds the application router. Uploads larger than `max_upload_bytes` are rejected.
pub fn router(state: SharedState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(handlers::home))
        .route(
            "/import-students/",
            get(handlers::import_form).post(handlers::import_upload),
        )
        .route("/attendance-list/", get(handlers::attendance_list))
        .route("/take-attendance/", get(handlers::take_attendance))
        .route(
            "/mark-attendance/",
            get(handlers::mark_redirect).post(handlers::mark_attendance),
        )
        .route("/attendance-complete/", get(handlers::attendance_complete))
        .route("/print-absentees/", get(handlers::print_absentees))
        .route("/absentees-list/", get(handlers::absentees_list))
        .fallback(handlers::not_found)
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(state)
}

/// Connects to the configured database and serves the application until the process exits.
pub async fn serve(settings: &Settings) -> anyhow::Result<()> {
    let manager = AttendanceManager::connect(&settings.database.url)
        .with_context(|| format!("opening database {}", settings.database.url))?;
    let state = Arc::new(AppState::new(manager).context("loading templates")?);

    let app = router(state, settings.server.max_upload_bytes);

    let listener = TcpListener::bind(&settings.server.bind_address)
        .await
        .with_context(|| format!("binding {}", settings.server.bind_address))?;
    log::info!(
        "Starting attendance server on http://{}",
        settings.server.bind_address
    );

    axum::serve(listener, app).await?;
    Ok(())
}
