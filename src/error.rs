//! Handler error type
//!
//! Every JSON endpoint returns `Result<HttpResponse, AppError>`; the error renders as
//! `{"error": "<message>"}` with the matching status code.

use crate::session::token::ConfigError;
use crate::store::StoreError;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    NotFound(String),
    /// Detail is logged, never returned to the client
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    #[must_use]
    pub fn unauthorized() -> Self {
        Self::Unauthorized("認証が必要です".to_string())
    }

    /// Generic 401 for a rejected LINE ID token
    #[must_use]
    pub fn authentication_failed() -> Self {
        Self::Unauthorized("認証に失敗しました".to_string())
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        Self::Internal(detail.into())
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            Self::BadRequest(message) | Self::Unauthorized(message) | Self::NotFound(message) => {
                message.as_str()
            }
            Self::Internal(detail) => {
                log::error!("Request failed: {detail}");
                "サーバーエラーが発生しました"
            }
        };
        HttpResponse::build(self.status_code()).json(json!({ "error": message }))
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => Self::NotFound(not_found_message(what)),
            StoreError::Conflict(message) => Self::BadRequest(message),
        }
    }
}

fn not_found_message(what: &str) -> String {
    match what {
        "survey" => "アンケートが見つかりません".to_string(),
        "user" => "ユーザーが見つかりません".to_string(),
        "school year" => "指定された年度が見つかりません".to_string(),
        other => format!("{other} が見つかりません"),
    }
}

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        Self::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    async fn body_json(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.error_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body()).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[actix_web::test]
    async fn test_error_body_shape() {
        let (status, body) = body_json(AppError::bad_request("タイトルを入力してください")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "タイトルを入力してください" }));
    }

    #[actix_web::test]
    async fn test_internal_detail_is_hidden() {
        let (status, body) = body_json(AppError::from(ConfigError::MissingSecret)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "サーバーエラーが発生しました");
    }

    #[test]
    fn test_store_error_mapping() {
        let err = AppError::from(StoreError::NotFound("survey"));
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.to_string(), "アンケートが見つかりません");

        let err = AppError::from(StoreError::NotFound("school year"));
        assert_eq!(err.to_string(), "指定された年度が見つかりません");
    }
}
