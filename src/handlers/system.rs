// Public service endpoints for the LIFF front end
use crate::settings::YomikikaseSettings;
use actix_web::{web, HttpRequest, HttpResponse};
use log::{debug, warn};
use serde_json::{json, Value};

/// Headers attached to every public service response
pub const SECURITY_HEADERS: [(&str, &str); 4] = [
    ("X-Content-Type-Options", "nosniff"),
    ("X-Frame-Options", "DENY"),
    ("Content-Security-Policy", "default-src 'none'"),
    ("Referrer-Policy", "no-referrer"),
];

fn secure_json(body: &Value) -> HttpResponse {
    let mut builder = HttpResponse::Ok();
    for header in SECURITY_HEADERS {
        builder.insert_header(header);
    }
    builder.json(body)
}

/// `GET /api/health`
pub async fn health() -> HttpResponse {
    secure_json(&json!({ "ok": true }))
}

/// `GET /api/config`: LIFF id, API base URL and environment name
pub async fn config(req: HttpRequest, settings: web::Data<YomikikaseSettings>) -> HttpResponse {
    let base_url = settings.application.public_base_url.clone().unwrap_or_else(|| {
        let connection = req.connection_info();
        format!("{}://{}", connection.scheme(), connection.host())
    });
    let api_base_url = format!("{}/api", base_url.trim_end_matches('/'));

    let liff_id = settings.line.liff_id.as_deref();
    if liff_id.is_none() {
        warn!("LIFF_ID is not configured");
    }
    debug!(
        "Serving config (has LIFF id: {}, environment: {})",
        liff_id.is_some(),
        settings.application.environment
    );

    secure_json(&json!({
        "liffId": liff_id,
        "apiBaseUrl": api_base_url,
        "environment": settings.application.environment,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{test, App};

    #[actix_web::test]
    async fn test_health_has_security_headers() {
        let app = test::init_service(App::new().route("/api/health", web::get().to(health))).await;
        let req = test::TestRequest::get().uri("/api/health").to_request();
        let resp = test::call_service(&app, req).await;

        assert!(resp.status().is_success());
        for (name, value) in SECURITY_HEADERS {
            assert_eq!(resp.headers().get(name).unwrap(), value);
        }
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body, json!({ "ok": true }));
    }

    #[actix_web::test]
    async fn test_config_uses_request_origin() {
        let mut settings = YomikikaseSettings::default();
        settings.line.liff_id = Some("1234-abcd".to_string());
        settings.application.environment = "staging".to_string();

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(settings))
                .route("/api/config", web::get().to(config)),
        )
        .await;
        let req = test::TestRequest::get()
            .uri("/api/config")
            .insert_header(("Host", "yomikikase.example"))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["liffId"], "1234-abcd");
        assert_eq!(body["apiBaseUrl"], "http://yomikikase.example/api");
        assert_eq!(body["environment"], "staging");
    }

    #[actix_web::test]
    async fn test_config_prefers_public_base_url() {
        let mut settings = YomikikaseSettings::default();
        settings.application.public_base_url = Some("https://yomikikase.example/".to_string());

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(settings))
                .route("/api/config", web::get().to(config)),
        )
        .await;
        let req = test::TestRequest::get().uri("/api/config").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["apiBaseUrl"], "https://yomikikase.example/api");
        assert_eq!(body["liffId"], Value::Null);
        assert_eq!(body["environment"], "production");
    }
}
