//! Edge Gatekeeper
//!
//! Runs ahead of routing on every request. Protected pages (`/` and everything under
//! `/admin`) need a valid `admin_session` cookie; anything else passes through. The
//! check is a pure HMAC recomputation with no store access, and it calls the same
//! [`token::verify`] as the session manager.

use crate::session::clock::{Clock, SystemClock};
use crate::session::cookie::{create_expired_cookie, COOKIE_NAME};
use crate::session::token::{self, SessionSecret};
use crate::settings::YomikikaseSettings;
use actix_web::body::{EitherBody, MessageBody};
use actix_web::dev::{ServiceRequest, ServiceResponse};
use actix_web::middleware::Next;
use actix_web::{web, Error, HttpResponse};
use std::sync::Arc;

/// Login page that unauthenticated requests are sent to
pub const LOGIN_PATH: &str = "/admin/login";

/// Prefix of the admin area
pub const ADMIN_PREFIX: &str = "/admin";

/// Path prefixes that bypass the session check entirely
pub const PUBLIC_PATHS: &[&str] = &["/admin/login", "/api/auth/login", "/api/auth/logout"];

/// Outcome of the gate for one request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Forward the request unchanged
    Pass,
    /// No usable session (or no secret): send to the login page
    RedirectToLogin,
    /// A cookie was present but invalid: send to login and delete it
    RedirectAndClear,
}

#[must_use]
pub fn is_public_path(path: &str) -> bool {
    PUBLIC_PATHS.iter().any(|prefix| path.starts_with(prefix))
}

#[must_use]
pub fn is_protected_path(path: &str) -> bool {
    path == "/" || path.starts_with(ADMIN_PREFIX)
}

/// Edge-side session check, configured independently of the session manager
#[derive(Clone)]
pub struct EdgeGatekeeper {
    secret: Option<SessionSecret>,
    clock: Arc<dyn Clock>,
    cookie_secure: bool,
}

impl EdgeGatekeeper {
    #[must_use]
    pub fn new(secret: Option<SessionSecret>, cookie_secure: bool) -> Self {
        Self {
            secret,
            clock: Arc::new(SystemClock),
            cookie_secure,
        }
    }

    /// Read the secret from the same settings source the session manager uses
    #[must_use]
    pub fn from_settings(settings: &YomikikaseSettings) -> Self {
        Self::new(settings.session_secret(), settings.cookie_secure())
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Verify a cookie value; `false` when no secret is configured
    #[must_use]
    pub fn verify(&self, value: &str) -> bool {
        self.secret
            .as_ref()
            .is_some_and(|secret| token::verify(secret, value, self.clock.now_ms()))
    }

    /// Decide what to do with a request for `path` carrying `cookie`
    #[must_use]
    pub fn decide(&self, path: &str, cookie: Option<&str>) -> GateDecision {
        if is_public_path(path) || !is_protected_path(path) {
            return GateDecision::Pass;
        }

        let Some(value) = cookie.filter(|value| !value.is_empty()) else {
            return GateDecision::RedirectToLogin;
        };

        if self.secret.is_none() {
            log::error!("AUTH_SECRET is not configured; denying access to {path}");
            return GateDecision::RedirectToLogin;
        }

        if self.verify(value) {
            GateDecision::Pass
        } else {
            log::debug!("Invalid session cookie on {path}; clearing");
            GateDecision::RedirectAndClear
        }
    }

    #[must_use]
    pub fn cookie_secure(&self) -> bool {
        self.cookie_secure
    }
}

fn login_redirect() -> actix_web::HttpResponseBuilder {
    let mut builder = HttpResponse::Found();
    builder.append_header(("Location", LOGIN_PATH));
    builder
}

/// Path as the router matches it. `req.path()` is the raw URI path and keeps
/// percent-encoding, so `/%61dmin` must be checked as `/admin`.
fn routed_path(req: &ServiceRequest) -> &str {
    req.match_info().as_str()
}

/// Middleware function wired with `actix_web::middleware::from_fn`.
///
/// Expects `web::Data<EdgeGatekeeper>` in app data; without it every protected
/// path is denied.
///
/// # Errors
///
/// Propagates errors from the inner service.
pub async fn edge_gatekeeper<B>(
    req: ServiceRequest,
    next: Next<B>,
) -> Result<ServiceResponse<EitherBody<B>>, Error>
where
    B: MessageBody + 'static,
{
    let (decision, cookie_secure) = match req.app_data::<web::Data<EdgeGatekeeper>>() {
        Some(gate) => {
            let cookie = req.cookie(COOKIE_NAME);
            let value = cookie.as_ref().map(actix_web::cookie::Cookie::value);
            (gate.decide(routed_path(&req), value), gate.cookie_secure())
        }
        None => {
            log::error!("Edge gatekeeper is not registered; denying protected paths");
            let path = routed_path(&req);
            let decision = if is_public_path(path) || !is_protected_path(path) {
                GateDecision::Pass
            } else {
                GateDecision::RedirectToLogin
            };
            (decision, true)
        }
    };

    match decision {
        GateDecision::Pass => next
            .call(req)
            .await
            .map(ServiceResponse::map_into_left_body),
        GateDecision::RedirectToLogin => {
            let response = login_redirect().finish();
            Ok(req.into_response(response).map_into_right_body())
        }
        GateDecision::RedirectAndClear => {
            let response = login_redirect()
                .cookie(create_expired_cookie(COOKIE_NAME, cookie_secure))
                .finish();
            Ok(req.into_response(response).map_into_right_body())
        }
    }
}
