// Admin authentication handlers: login, logout and session status
use super::types::LoginRequest;
use crate::auth::AdminCredentials;
use crate::error::AppError;
use crate::session::SessionManager;
use actix_web::{web, HttpRequest, HttpResponse};
use log::{info, warn};
use serde_json::json;

/// Reject the request unless it carries a valid admin session
///
/// # Errors
///
/// Returns `AppError::Unauthorized` when the session cookie is missing or invalid.
pub fn require_admin(req: &HttpRequest, session_manager: &SessionManager) -> Result<(), AppError> {
    if session_manager.is_authenticated(req) {
        Ok(())
    } else {
        Err(AppError::unauthorized())
    }
}

/// Admin login
///
/// # Errors
///
/// Returns an error if:
/// - Username or password is missing (400)
/// - The credentials do not match (401)
/// - No session secret is configured (500)
pub async fn login(
    body: web::Json<LoginRequest>,
    credentials: web::Data<AdminCredentials>,
    session_manager: web::Data<SessionManager>,
) -> Result<HttpResponse, AppError> {
    let LoginRequest { username, password } = body.into_inner();
    let (Some(username), Some(password)) = (
        username.filter(|value| !value.is_empty()),
        password.filter(|value| !value.is_empty()),
    ) else {
        return Err(AppError::bad_request("ユーザー名とパスワードを入力してください"));
    };

    if !credentials.validate(&username, &password) {
        warn!("Rejected admin login attempt");
        return Err(AppError::Unauthorized(
            "ユーザー名またはパスワードが正しくありません".to_string(),
        ));
    }

    let cookie = session_manager.create_session()?;
    info!("Admin signed in");

    Ok(HttpResponse::Ok()
        .cookie(cookie)
        .json(json!({ "success": true })))
}

/// Admin logout; always succeeds and expires the session cookie
pub async fn logout(session_manager: web::Data<SessionManager>) -> HttpResponse {
    HttpResponse::Ok()
        .cookie(session_manager.clear_session())
        .json(json!({ "success": true }))
}

/// Report whether the caller holds a valid admin session
pub async fn session_status(
    req: HttpRequest,
    session_manager: web::Data<SessionManager>,
) -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "authenticated": session_manager.is_authenticated(&req)
    }))
}
