// HTTP request handlers
pub mod auth;
pub mod liff;
pub mod pages;
pub mod surveys;
pub mod system;
pub mod types;


use crate::error::AppError;
use actix_web::{error::JsonPayloadError, web, HttpRequest};

// Re-export the main handler functions
pub use auth::{login, logout, require_admin, session_status};
pub use system::{config, health};

/// Malformed JSON bodies become a 400 with the usual `{"error": ...}` body
#[must_use]
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err: JsonPayloadError, _req: &HttpRequest| {
        log::debug!("Rejected request body: {err}");
        AppError::bad_request("リクエストの形式が不正です").into()
    })
}

/// Route table
pub fn configure_services(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        // Pages
        .route("/", web::get().to(pages::root))
        .route("/admin", web::get().to(pages::admin_home))
        .route("/admin/login", web::get().to(pages::login_page))
        // Admin authentication
        .route("/api/auth/login", web::post().to(auth::login))
        .route("/api/auth/logout", web::post().to(auth::logout))
        .route("/api/auth/session", web::get().to(auth::session_status))
        // Admin survey API
        .route(
            "/api/school-years",
            web::get().to(surveys::list_school_years),
        )
        .service(
            web::resource("/api/surveys")
                .route(web::get().to(surveys::list_surveys))
                .route(web::post().to(surveys::create_survey)),
        )
        .route(
            "/api/surveys/{survey_id}/responses",
            web::get().to(surveys::list_responses),
        )
        .route(
            "/api/surveys/{survey_id}/responses/export",
            web::get().to(surveys::export_responses),
        )
        // LIFF API
        .route("/api/liff/auth", web::post().to(liff::authenticate))
        .service(
            web::resource("/api/liff/profile")
                .route(web::get().to(liff::get_profile))
                .route(web::post().to(liff::save_profile)),
        )
        .service(
            web::resource("/api/liff/survey")
                .route(web::get().to(liff::get_survey))
                .route(web::post().to(liff::submit_survey)),
        )
        // Public service endpoints
        .route("/api/health", web::get().to(system::health))
        .route("/api/config", web::get().to(system::config));
}
