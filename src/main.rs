#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

use actix_cors::Cors;
use actix_web::{middleware::from_fn, middleware::Logger, App, HttpServer};
use yomikikase::{edge_gatekeeper, AppState, YomikikaseSettings};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load configuration from Settings.toml and environment variables
    // This also loads .env file and initializes the logger
    let settings = YomikikaseSettings::load()
        .map_err(|e| std::io::Error::other(format!("Failed to load settings: {e}")))?;

    let state = AppState::from_settings(settings)
        .map_err(|e| std::io::Error::other(format!("Failed to initialize services: {e}")))?;

    start_server(state).await
}

/// Start the HTTP server
///
/// # Errors
///
/// Returns an error if:
/// - Server binding fails
/// - Server fails to start
async fn start_server(state: AppState) -> std::io::Result<()> {
    let bind_address = state.settings.get_bind_address();
    print_startup_info(&bind_address, &state.settings);

    let cors_origins = state.settings.get_cors_origins();

    HttpServer::new(move || {
        let cors_origins = cors_origins.clone();
        let cors = Cors::default()
            .allowed_origin_fn(move |origin, _| {
                cors_origins
                    .iter()
                    .any(|allowed| allowed == origin.to_str().unwrap_or(""))
            })
            .allowed_methods(vec!["GET", "POST", "OPTIONS"])
            .allowed_headers(vec!["Content-Type", "Accept"])
            .supports_credentials()
            .max_age(3600);

        let state = state.clone();
        App::new()
            .wrap(from_fn(edge_gatekeeper))
            .wrap(cors)
            .wrap(Logger::default())
            .configure(move |cfg| state.configure(cfg))
    })
    .bind(&bind_address)?
    .run()
    .await
}

fn print_startup_info(bind_address: &str, settings: &YomikikaseSettings) {
    println!(
        "Starting yomikikase {} on http://{bind_address}",
        yomikikase::VERSION
    );
    println!("Environment: {}", settings.application.environment);
    println!("Secure cookies: {}", settings.cookie_secure());
    println!();
    println!("Admin endpoints (admin_session cookie):");
    println!("  GET  /admin/login                         - Login page");
    println!("  POST /api/auth/login | /api/auth/logout   - Sign in / out");
    println!("  GET  /api/auth/session                    - Session status");
    println!("  GET  /api/school-years                    - School years");
    println!("  GET|POST /api/surveys                     - Surveys");
    println!("  GET  /api/surveys/{{id}}/responses[/export] - Responses (JSON / CSV)");
    println!();
    println!("LIFF endpoints (LINE ID token):");
    println!("  POST /api/liff/auth");
    println!("  GET|POST /api/liff/profile");
    println!("  GET|POST /api/liff/survey");
    println!();
    println!("System endpoints:");
    println!("  GET  /api/health");
    println!("  GET  /api/config");
}
