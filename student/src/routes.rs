use axum::extract::State;
use axum::http::{StatusCode, header::LOCATION};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router, routing::{get, post}};
use codeloom_controller::{CodespaceUrl, ControllerError};
use codeloom_store::{CodespaceStatus, StoreError, UserInfo};
use serde::{Deserialize, Serialize};

use crate::app::App;
use crate::auth::Principal;

const MANAGEMENT_PATH: &str = "/";

pub fn router(app: App) -> Router {
    Router::new()
        .route("/login", post(login))
        .route("/user", get(get_user).put(put_user).patch(patch_user))
        .route("/codespace", get(codespace_redirect).post(start_codespace).delete(stop_codespace))
        .route("/codespace/info", get(codespace_info))
        .route("/codespace/keepalive", post(keepalive))
        .route("/healthz", get(|| async { "ok" }))
        .with_state(app)
}

fn controller_error_response(e: ControllerError) -> Response {
    match e {
        ControllerError::NotFound(sid) => {
            codeloom_common::response::forbidden(anyhow::anyhow!("student {sid:?} not found"))
        }
        ControllerError::QuotaExceeded(sid) => codeloom_common::response::err_resp(
            anyhow::anyhow!("codespace quota exceeded for {sid:?}"),
            StatusCode::PAYMENT_REQUIRED,
        ),
        other => codeloom_common::response::error(other),
    }
}

#[derive(Deserialize)]
struct LoginBody {
    sid: String,
    pwd: String,
}

async fn login(State(app): State<App>, Json(body): Json<LoginBody>) -> Response {
    let student = match app.controller.store().read(&body.sid).await {
        Ok(s) => s,
        Err(StoreError::NotFound(_)) => {
            return codeloom_common::response::forbidden(anyhow::anyhow!("unknown student"));
        }
        Err(e) => return codeloom_common::response::error(e),
    };

    if !codeloom_store::verify_password(&body.pwd, &student.pwd_hash) {
        return codeloom_common::response::unauthorized(anyhow::anyhow!("wrong password"));
    }

    app.tokens.encode(&body.sid).into_response()
}

#[derive(Serialize)]
struct UserProfile {
    name: String,
    mail: String,
}

async fn get_user(State(app): State<App>, Principal(sid): Principal) -> Response {
    match app.controller.store().read(&sid).await {
        Ok(student) => Json(UserProfile { name: student.user_info.name, mail: student.user_info.mail }).into_response(),
        Err(e) => codeloom_common::response::error(e),
    }
}

#[derive(Deserialize)]
struct UserProfileUpdate {
    name: String,
    mail: String,
}

async fn put_user(State(app): State<App>, Principal(sid): Principal, Json(body): Json<UserProfileUpdate>) -> Response {
    match app.controller.store().set_user_info(&sid, UserInfo { name: body.name, mail: body.mail }).await {
        Ok(()) => StatusCode::OK.into_response(),
        Err(e @ StoreError::Oversize { .. }) => codeloom_common::response::bad_request(e),
        Err(StoreError::NotFound(_)) => codeloom_common::response::forbidden(anyhow::anyhow!("student not found")),
        Err(e) => codeloom_common::response::error(e),
    }
}

#[derive(Deserialize)]
struct PasswordChange {
    old_pwd: String,
    new_pwd: String,
}

async fn patch_user(State(app): State<App>, Principal(sid): Principal, Json(body): Json<PasswordChange>) -> Response {
    if !app.controller.store().check_password(&sid, &body.old_pwd).await {
        return codeloom_common::response::bad_request(anyhow::anyhow!("old password does not match"));
    }
    match app.controller.store().reset_password(&sid, &body.new_pwd).await {
        Ok(()) => StatusCode::OK.into_response(),
        Err(e) => codeloom_common::response::error(e),
    }
}

fn redirect(status: StatusCode, location: &str) -> Response {
    (status, [(LOCATION, location.to_string())]).into_response()
}

async fn codespace_redirect(State(app): State<App>, Principal(sid): Principal) -> Response {
    match app.controller.get_url(&sid).await {
        Ok(CodespaceUrl::Ready(url)) => redirect(StatusCode::FOUND, &url),
        Ok(CodespaceUrl::Pending) => redirect(StatusCode::TEMPORARY_REDIRECT, MANAGEMENT_PATH),
        Ok(CodespaceUrl::None) => redirect(StatusCode::SEE_OTHER, MANAGEMENT_PATH),
        Err(e) => controller_error_response(e),
    }
}

async fn start_codespace(State(app): State<App>, Principal(sid): Principal) -> Response {
    match app.controller.get_status(&sid).await {
        Ok(CodespaceStatus::Running) => StatusCode::ACCEPTED.into_response(),
        Ok(_) => match app.controller.start(&sid).await {
            Ok(()) => StatusCode::OK.into_response(),
            Err(e) => controller_error_response(e),
        },
        Err(e) => controller_error_response(e),
    }
}

async fn stop_codespace(State(app): State<App>, Principal(sid): Principal) -> Response {
    match app.controller.get_status(&sid).await {
        Ok(CodespaceStatus::Stopped) => StatusCode::ACCEPTED.into_response(),
        Ok(_) => match app.controller.stop(&sid).await {
            Ok(()) => StatusCode::OK.into_response(),
            Err(e) => controller_error_response(e),
        },
        Err(e) => controller_error_response(e),
    }
}

#[derive(Serialize)]
struct CodespaceInfoResponse {
    access_url: serde_json::Value,
    last_start: i64,
    last_stop: i64,
    time_quota: i64,
    time_used: i64,
    space_quota: i64,
    space_used: i64,
}

async fn codespace_info(State(app): State<App>, Principal(sid): Principal) -> Response {
    let access_url = match app.controller.get_url(&sid).await {
        Ok(CodespaceUrl::Ready(url)) => serde_json::Value::String(url),
        Ok(CodespaceUrl::Pending) => serde_json::Value::Bool(true),
        Ok(CodespaceUrl::None) => serde_json::Value::Bool(false),
        Err(e) => return controller_error_response(e),
    };

    match app.controller.store().read(&sid).await {
        Ok(student) => Json(CodespaceInfoResponse {
            access_url,
            last_start: student.codespace.last_start,
            last_stop: student.codespace.last_stop,
            time_quota: student.codespace.time_quota,
            time_used: student.codespace.time_used,
            space_quota: 0,
            space_used: 0,
        })
        .into_response(),
        Err(e) => codeloom_common::response::error(e),
    }
}

async fn keepalive(State(app): State<App>, Principal(sid): Principal) -> Response {
    match app.controller.keep_alive(&sid).await {
        Ok(()) => StatusCode::OK.into_response(),
        Err(e) => controller_error_response(e),
    }
}
