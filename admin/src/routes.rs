use axum::extract::{Path, State};
use axum::http::{StatusCode, header::LOCATION};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router, routing::{delete, get, post, put}};
use codeloom_controller::{CodespaceUrl, ControllerError};
use codeloom_store::{CodespaceStatus, Student, UserInfo};
use serde::{Deserialize, Serialize};

use crate::app::App;
use crate::auth::AdminKey;

/// Management page students are sent to while their codespace is not
/// in a redirectable state. Not a real page in this system; callers
/// are expected to treat any non-302 response as "show the control
/// panel yourself".
const MANAGEMENT_PATH: &str = "/";

pub fn router(app: App) -> Router {
    Router::new()
        .route("/student", get(list_students).post(create_students).delete(delete_students))
        .route("/student/{sid}", get(student_detail))
        .route("/student/codespace/{sid}", get(codespace_redirect).post(start_codespace).delete(stop_codespace))
        .route("/student/codespace/info/{sid}", get(codespace_info))
        .route("/student/codespace", post(batch_start_codespace).delete(batch_stop_codespace))
        .route("/student/codespace/quota/{sid}", put(set_quota))
        .route("/healthz", get(|| async { "ok" }))
        .with_state(app)
}

#[derive(Serialize)]
struct StudentBrief {
    id: String,
    name: String,
    mail: String,
}

impl From<&Student> for StudentBrief {
    fn from(s: &Student) -> Self {
        Self { id: s.sid.clone(), name: s.user_info.name.clone(), mail: s.user_info.mail.clone() }
    }
}

#[derive(Serialize)]
struct StudentDetail {
    id: String,
    name: String,
    mail: String,
    status: CodespaceStatus,
    url: String,
    time_quota: i64,
    time_used: i64,
    last_start: i64,
    last_stop: i64,
    last_active: i64,
    last_watch: i64,
}

impl From<&Student> for StudentDetail {
    fn from(s: &Student) -> Self {
        Self {
            id: s.sid.clone(),
            name: s.user_info.name.clone(),
            mail: s.user_info.mail.clone(),
            status: s.codespace.status,
            url: s.codespace.url.clone(),
            time_quota: s.codespace.time_quota,
            time_used: s.codespace.time_used,
            last_start: s.codespace.last_start,
            last_stop: s.codespace.last_stop,
            last_active: s.codespace.last_active,
            last_watch: s.codespace.last_watch,
        }
    }
}

#[derive(Serialize)]
struct BatchFailure {
    id: String,
    reason: String,
}

#[derive(Serialize)]
struct BatchResult<T: Serialize> {
    success: Vec<T>,
    failed: Vec<BatchFailure>,
}

fn controller_error_response(e: ControllerError) -> Response {
    match e {
        ControllerError::NotFound(sid) => {
            codeloom_common::response::not_found(anyhow::anyhow!("student {sid:?} not found"))
        }
        ControllerError::QuotaExceeded(sid) => codeloom_common::response::err_resp(
            anyhow::anyhow!("codespace quota exceeded for {sid:?}"),
            StatusCode::PAYMENT_REQUIRED,
        ),
        other => codeloom_common::response::error(other),
    }
}

async fn list_students(State(app): State<App>, _key: AdminKey) -> Response {
    match app.controller.store().iter_all().await {
        Ok(students) => Json(students.iter().map(StudentBrief::from).collect::<Vec<_>>()).into_response(),
        Err(e) => codeloom_common::response::error(e),
    }
}

#[derive(Deserialize)]
struct StudentCreateBody {
    id: String,
    name: String,
    mail: String,
    pwd: String,
    #[serde(default)]
    time_quota: i64,
}

async fn create_students(
    State(app): State<App>,
    _key: AdminKey,
    Json(body): Json<Vec<StudentCreateBody>>,
) -> Response {
    let mut success = Vec::new();
    let mut failed = Vec::new();

    for item in body {
        let pwd_hash = match codeloom_store::hash_password(&item.pwd) {
            Ok(h) => h,
            Err(e) => {
                failed.push(BatchFailure { id: item.id, reason: e.to_string() });
                continue;
            }
        };
        let user_info = UserInfo { name: item.name.clone(), mail: item.mail.clone() };
        match app.controller.create_student(&item.id, user_info, pwd_hash, item.time_quota).await {
            Ok(student) => success.push(StudentBrief::from(&student)),
            Err(e) => failed.push(BatchFailure { id: item.id, reason: e.to_string() }),
        }
    }

    Json(BatchResult { success, failed }).into_response()
}

#[derive(Deserialize)]
struct StudentIdBody {
    id: String,
}

async fn delete_students(
    State(app): State<App>,
    _key: AdminKey,
    Json(body): Json<Vec<StudentIdBody>>,
) -> Response {
    let mut success = Vec::new();
    let mut failed = Vec::new();

    for item in body {
        match app.controller.delete_student(&item.id).await {
            Ok(()) => success.push(item.id),
            Err(e) => failed.push(BatchFailure { id: item.id, reason: e.to_string() }),
        }
    }

    Json(BatchResult { success, failed }).into_response()
}

async fn student_detail(State(app): State<App>, _key: AdminKey, Path(sid): Path<String>) -> Response {
    match app.controller.store().read(&sid).await {
        Ok(student) => Json(StudentDetail::from(&student)).into_response(),
        Err(codeloom_store::StoreError::NotFound(_)) => {
            codeloom_common::response::not_found(anyhow::anyhow!("student {sid:?} not found"))
        }
        Err(e) => codeloom_common::response::error(e),
    }
}

fn redirect(status: StatusCode, location: &str) -> Response {
    (status, [(LOCATION, location.to_string())]).into_response()
}

async fn codespace_redirect(State(app): State<App>, _key: AdminKey, Path(sid): Path<String>) -> Response {
    match app.controller.get_url(&sid).await {
        Ok(CodespaceUrl::Ready(url)) => redirect(StatusCode::FOUND, &url),
        Ok(CodespaceUrl::Pending) => redirect(StatusCode::TEMPORARY_REDIRECT, MANAGEMENT_PATH),
        Ok(CodespaceUrl::None) => redirect(StatusCode::SEE_OTHER, MANAGEMENT_PATH),
        Err(e) => controller_error_response(e),
    }
}

async fn start_codespace(State(app): State<App>, _key: AdminKey, Path(sid): Path<String>) -> Response {
    match app.controller.get_status(&sid).await {
        Ok(CodespaceStatus::Running) => StatusCode::ACCEPTED.into_response(),
        Ok(_) => match app.controller.start(&sid).await {
            Ok(()) => StatusCode::OK.into_response(),
            Err(e) => controller_error_response(e),
        },
        Err(e) => controller_error_response(e),
    }
}

async fn stop_codespace(State(app): State<App>, _key: AdminKey, Path(sid): Path<String>) -> Response {
    match app.controller.get_status(&sid).await {
        Ok(CodespaceStatus::Stopped) => StatusCode::ACCEPTED.into_response(),
        Ok(_) => match app.controller.stop(&sid).await {
            Ok(()) => StatusCode::OK.into_response(),
            Err(e) => controller_error_response(e),
        },
        Err(e) => controller_error_response(e),
    }
}

async fn codespace_info(State(app): State<App>, _key: AdminKey, Path(sid): Path<String>) -> Response {
    // Resolve status against the orchestrator first so the response
    // reflects reality rather than a stale record.
    if let Err(e) = app.controller.get_status(&sid).await {
        return controller_error_response(e);
    }
    match app.controller.store().read(&sid).await {
        Ok(student) => Json(StudentDetail::from(&student)).into_response(),
        Err(codeloom_store::StoreError::NotFound(_)) => {
            codeloom_common::response::not_found(anyhow::anyhow!("student {sid:?} not found"))
        }
        Err(e) => codeloom_common::response::error(e),
    }
}

#[derive(Deserialize)]
struct CodespaceBatchOperation {
    ids: Vec<String>,
}

async fn batch_start_codespace(State(app): State<App>, _key: AdminKey, Json(body): Json<CodespaceBatchOperation>) -> Response {
    let mut success = Vec::new();
    let mut failed = Vec::new();
    for sid in body.ids {
        match app.controller.start(&sid).await {
            Ok(()) => success.push(sid),
            Err(e) => failed.push(BatchFailure { id: sid, reason: e.to_string() }),
        }
    }
    Json(BatchResult { success, failed }).into_response()
}

async fn batch_stop_codespace(State(app): State<App>, _key: AdminKey, Json(body): Json<CodespaceBatchOperation>) -> Response {
    let mut success = Vec::new();
    let mut failed = Vec::new();
    for sid in body.ids {
        match app.controller.stop(&sid).await {
            Ok(()) => success.push(sid),
            Err(e) => failed.push(BatchFailure { id: sid, reason: e.to_string() }),
        }
    }
    Json(BatchResult { success, failed }).into_response()
}

#[derive(Deserialize)]
struct CodespaceQuotaBody {
    time_quota: i64,
    #[serde(default)]
    #[allow(dead_code)]
    space_quota: i64,
}

async fn set_quota(
    State(app): State<App>,
    _key: AdminKey,
    Path(sid): Path<String>,
    Json(body): Json<CodespaceQuotaBody>,
) -> Response {
    match app.controller.store().set_time_quota(&sid, body.time_quota).await {
        Ok(()) => StatusCode::OK.into_response(),
        Err(codeloom_store::StoreError::NotFound(_)) => {
            codeloom_common::response::not_found(anyhow::anyhow!("student {sid:?} not found"))
        }
        Err(e) => codeloom_common::response::error(e),
    }
}
