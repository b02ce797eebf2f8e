use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use axum::response::Response;
use rollcall::manager::AttendanceManager;
use rollcall::web::{AppState, router};
use std::sync::Arc;
use tower::ServiceExt;

const BOUNDARY: &str = "rollcall-test-boundary";

fn app() -> Router {
    app_with_limit(1024 * 1024)
}

fn app_with_limit(max_upload_bytes: usize) -> Router {
    let manager = AttendanceManager::connect(":memory:").expect("in-memory database");
    let state = Arc::new(AppState::new(manager).expect("templates"));
    router(state, max_upload_bytes)
}

async fn send(app: &Router, request: Request<Body>) -> Response {
    app.clone().oneshot(request).await.expect("infallible router")
}

async fn get(app: &Router, uri: &str) -> Response {
    send(app, Request::builder().uri(uri).body(Body::empty()).unwrap()).await
}

async fn body_text(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn location(response: &Response) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .expect("redirect location")
        .to_str()
        .unwrap()
}

/// The `name=value` part of the flash cookie set on `response`.
fn flash_cookie(response: &Response) -> String {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find(|value| value.starts_with("rollcall_flash="))
        .and_then(|value| value.split(';').next())
        .expect("flash cookie")
        .to_string()
}

async fn upload(app: &Router, filename: &str, contents: &str) -> Response {
    let body = format!(
        "--{BOUNDARY}\r\n\
         Content-Disposition: form-data; name=\"excel_file\"; filename=\"{filename}\"\r\n\
         Content-Type: application/octet-stream\r\n\r\n\
         {contents}\r\n\
         --{BOUNDARY}--\r\n"
    );
    let request = Request::builder()
        .method("POST")
        .uri("/import-students/")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap();
    send(app, request).await
}

async fn mark(app: &Router, form: &str) -> Response {
    let request = Request::builder()
        .method("POST")
        .uri("/mark-attendance/")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(form.to_string()))
        .unwrap();
    send(app, request).await
}

const ROSTER: &str = "Student Name,Roll Number,Course Name\nJane Doe,R001,CS\nAli Khan,R002,Maths";

#[tokio::test]
async fn empty_roster_goes_straight_to_completion() {
    let app = app();

    let response = get(&app, "/take-attendance/").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/attendance-complete/");

    let response = get(&app, "/attendance-complete/").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("Everyone is present today."));
}

#[tokio::test]
async fn import_then_walk_the_roster() {
    let app = app();

    let response = upload(&app, "roster.csv", ROSTER).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/attendance-list/");
    let cookie = flash_cookie(&response);

    // The flash message shows up once on the next page.
    let request = Request::builder()
        .uri("/attendance-list/")
        .header(header::COOKIE, &cookie)
        .body(Body::empty())
        .unwrap();
    let list = body_text(send(&app, request).await).await;
    assert!(list.contains("Successfully imported 2 students"));
    assert!(list.contains("R001"));
    assert!(list.contains("R002"));

    let first = body_text(get(&app, "/take-attendance/?index=0").await).await;
    assert!(first.contains("Jane Doe"));
    assert!(first.contains("Student 1 of 2"));
    assert!(first.contains(r#"name="student_id" value="1""#));

    let response = mark(&app, "student_id=1&action=absent&current_index=0").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/take-attendance/?index=1");

    let second = body_text(get(&app, "/take-attendance/?index=1").await).await;
    assert!(second.contains("Ali Khan"));

    let response = mark(&app, "student_id=2&action=present&current_index=1").await;
    assert_eq!(location(&response), "/take-attendance/?index=2");

    // Past the last student the walk ends.
    let response = get(&app, "/take-attendance/?index=2").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/attendance-complete/");

    let complete = body_text(get(&app, "/attendance-complete/").await).await;
    assert!(complete.contains("1 absent"));
    assert!(complete.contains("Jane Doe"));
    assert!(!complete.contains("Ali Khan"));

    let report = body_text(get(&app, "/print-absentees/").await).await;
    assert!(report.contains("Attendance: 50.00%"));

    // Revisiting Jane and marking her present clears the absence.
    let revisit = body_text(get(&app, "/take-attendance/?index=0").await).await;
    assert!(revisit.contains(r#"<span class="status-absent">Absent</span>"#));
    mark(&app, "student_id=1&action=present&current_index=0").await;

    let list = body_text(get(&app, "/attendance-list/").await).await;
    assert!(!list.contains(r#"<td class="status-absent">"#));
}

#[tokio::test]
async fn reimport_creates_nobody() {
    let app = app();
    upload(&app, "roster.csv", ROSTER).await;

    let response = upload(&app, "roster.csv", ROSTER).await;
    assert_eq!(location(&response), "/attendance-list/");
    let cookie = flash_cookie(&response);

    let request = Request::builder()
        .uri("/attendance-list/")
        .header(header::COOKIE, &cookie)
        .body(Body::empty())
        .unwrap();
    let list = body_text(send(&app, request).await).await;
    assert!(list.contains("Successfully imported 0 students"));
    assert!(list.contains("0 absent of 2 students"));
}

#[tokio::test]
async fn bad_uploads_return_to_the_form() {
    let app = app();

    let response = upload(&app, "roster.pdf", ROSTER).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/import-students/");
    assert!(flash_cookie(&response).starts_with("rollcall_flash=error"));

    let response = upload(&app, "roster.csv", "Name,Roll\nJane,R001").await;
    assert_eq!(location(&response), "/import-students/");
    let cookie = flash_cookie(&response);

    let request = Request::builder()
        .uri("/import-students/")
        .header(header::COOKIE, &cookie)
        .body(Body::empty())
        .unwrap();
    let form = body_text(send(&app, request).await).await;
    assert!(form.contains("Excel file must contain columns"));

    let response = get(&app, "/attendance-list/").await;
    assert!(body_text(response).await.contains("No students yet."));
}

/// Follows a redirect's flash cookie to `uri` and returns the rendered page.
async fn follow_flash(app: &Router, response: &Response, uri: &str) -> String {
    let request = Request::builder()
        .uri(uri)
        .header(header::COOKIE, flash_cookie(response))
        .body(Body::empty())
        .unwrap();
    body_text(send(app, request).await).await
}

#[tokio::test]
async fn empty_upload_asks_for_a_file() {
    let app = app();

    let response = upload(&app, "", "").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/import-students/");

    let form = follow_flash(&app, &response, "/import-students/").await;
    assert!(form.contains("Please choose a file to import"));
}

#[tokio::test]
async fn oversized_upload_is_rejected_with_a_size_message() {
    let app = app_with_limit(64);

    let response = upload(&app, "roster.csv", ROSTER).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/import-students/");
    assert!(flash_cookie(&response).starts_with("rollcall_flash=error"));

    let form = follow_flash(&app, &response, "/import-students/").await;
    assert!(form.contains("too large to import"));

    let list = body_text(get(&app, "/attendance-list/").await).await;
    assert!(list.contains("No students yet."));
}

#[tokio::test]
async fn cursor_at_the_end_or_mangled_never_skips_or_crashes() {
    let app = app();
    upload(&app, "roster.csv", ROSTER).await;

    let response = mark(
        &app,
        &format!("student_id=1&action=absent&current_index={}", usize::MAX),
    )
    .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/attendance-complete/");

    let response = mark(&app, "student_id=2&action=present&current_index=oops").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/take-attendance/");

    // Both marks were recorded despite the odd cursors.
    let complete = body_text(get(&app, "/attendance-complete/").await).await;
    assert!(complete.contains("Jane Doe"));
    assert!(!complete.contains("Ali Khan"));
}

#[tokio::test]
async fn unknown_student_is_a_404() {
    let app = app();

    let response = mark(&app, "student_id=42&action=absent&current_index=0").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(body_text(response).await.contains("No student found for"));

    let response = mark(&app, "student_id=abc&action=absent").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_index_restarts_the_walk() {
    let app = app();

    let response = get(&app, "/take-attendance/?index=-3").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/take-attendance/");
}

#[tokio::test]
async fn absentees_list_date_filter() {
    let app = app();

    let past = body_text(get(&app, "/absentees-list/?date=2020-01-01").await).await;
    assert!(past.contains("2020-01-01: 0 absent"));
    assert!(past.contains("No absentees for this date."));

    let response = get(&app, "/absentees-list/?date=yesterday").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains("is not a valid date"));
    assert!(body.contains("No absentees for this date."));
}

#[tokio::test]
async fn mark_by_get_goes_back_to_the_walk() {
    let app = app();

    let response = get(&app, "/mark-attendance/").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/take-attendance/");
}

#[tokio::test]
async fn unknown_paths_are_404() {
    let app = app();

    let response = get(&app, "/admin/").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(body_text(response).await.contains("Invalid path: /admin/"));
}
