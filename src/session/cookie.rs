use actix_web::cookie::{time::Duration, Cookie, SameSite};
use actix_web::HttpRequest;

use super::token::SESSION_MAX_AGE_SECONDS;

/// Admin session cookie name
pub const COOKIE_NAME: &str = "admin_session";

/// Options for cookie creation
pub struct CookieOptions {
    pub http_only: bool,
    pub secure: bool,
    pub same_site: SameSite,
    pub path: String,
    pub max_age: Duration,
}

impl Default for CookieOptions {
    fn default() -> Self {
        Self {
            http_only: true,
            secure: true,
            same_site: SameSite::Lax,
            path: "/".to_string(),
            max_age: Duration::seconds(SESSION_MAX_AGE_SECONDS),
        }
    }
}

/// Cookie factory for the admin session cookie
///
/// Centralises cookie attributes so login, logout and the edge gatekeeper all
/// emit the same `Set-Cookie` shape.
#[derive(Debug, Clone, Copy)]
pub struct CookieFactory {
    cookie_secure: bool,
}

impl CookieFactory {
    #[must_use]
    pub fn new(cookie_secure: bool) -> Self {
        Self { cookie_secure }
    }

    /// Build a cookie; `secure` is only set when both the factory and the options allow it
    #[must_use]
    pub fn create_cookie(&self, name: &str, value: String, options: CookieOptions) -> Cookie<'static> {
        Cookie::build(name.to_owned(), value)
            .http_only(options.http_only)
            .secure(self.cookie_secure && options.secure)
            .same_site(options.same_site)
            .path(options.path)
            .max_age(options.max_age)
            .finish()
    }

    /// Session cookie carrying a signed token
    #[must_use]
    pub fn create_session_cookie(&self, token: String) -> Cookie<'static> {
        self.create_cookie(COOKIE_NAME, token, CookieOptions::default())
    }

    /// Create an expired cookie to clear the session
    #[must_use]
    pub fn create_expired_cookie(&self) -> Cookie<'static> {
        create_expired_cookie(COOKIE_NAME, self.cookie_secure)
    }

    #[must_use]
    pub fn cookie_secure(&self) -> bool {
        self.cookie_secure
    }
}

/// Read a cookie value, treating an empty value as absent
#[must_use]
pub fn extract_cookie_value(req: &HttpRequest, cookie_name: &str) -> Option<String> {
    req.cookie(cookie_name)
        .map(|cookie| cookie.value().to_string())
        .filter(|value| !value.is_empty())
}

/// Create an expired cookie to clear a specific cookie
#[must_use]
pub fn create_expired_cookie(name: &str, secure: bool) -> Cookie<'static> {
    Cookie::build(name.to_owned(), "")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(Duration::seconds(-1))
        .finish()
}
