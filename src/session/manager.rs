//! Session Manager - stateless signed-cookie sessions
//!
//! The `SessionManager` is the handler-side owner of the admin session: it mints a
//! token at login, checks the cookie on requests that need authentication state and
//! builds the `Set-Cookie` values for login and logout. The token format itself lives
//! in [`crate::session::token`].

use crate::session::clock::{Clock, SystemClock};
use crate::session::cookie::{extract_cookie_value, CookieFactory, COOKIE_NAME};
use crate::session::token::{self, ConfigError, SessionSecret};
use crate::settings::YomikikaseSettings;
use actix_web::cookie::Cookie;
use actix_web::HttpRequest;
use std::sync::Arc;

/// Session manager for the single configured admin
#[derive(Clone)]
pub struct SessionManager {
    secret: Option<SessionSecret>,
    clock: Arc<dyn Clock>,
    cookie_factory: CookieFactory,
}

impl SessionManager {
    /// Create a session manager on the system clock.
    ///
    /// A `None` secret leaves the manager able to clear cookies but unable to mint or
    /// accept any session.
    #[must_use]
    pub fn new(secret: Option<SessionSecret>, cookie_secure: bool) -> Self {
        Self {
            secret,
            clock: Arc::new(SystemClock),
            cookie_factory: CookieFactory::new(cookie_secure),
        }
    }

    /// Create a session manager from loaded settings
    #[must_use]
    pub fn from_settings(settings: &YomikikaseSettings) -> Self {
        Self::new(settings.session_secret(), settings.cookie_secure())
    }

    /// Replace the time source
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Mint a new signed session token
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingSecret` when no shared secret is configured.
    pub fn mint(&self) -> Result<String, ConfigError> {
        let secret = self.secret.as_ref().ok_or(ConfigError::MissingSecret)?;
        Ok(token::mint(secret, self.clock.as_ref()))
    }

    /// Verify a session token value
    #[must_use]
    pub fn verify(&self, value: &str) -> bool {
        let Some(secret) = &self.secret else {
            log::error!("AUTH_SECRET is not configured; treating session as unauthenticated");
            return false;
        };
        token::verify(secret, value, self.clock.now_ms())
    }

    /// Check the request's `admin_session` cookie
    #[must_use]
    pub fn is_authenticated(&self, req: &HttpRequest) -> bool {
        extract_cookie_value(req, COOKIE_NAME).is_some_and(|value| self.verify(&value))
    }

    /// Mint a token and wrap it in the session cookie
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingSecret` when no shared secret is configured.
    pub fn create_session(&self) -> Result<Cookie<'static>, ConfigError> {
        let token = self.mint()?;
        Ok(self.cookie_factory.create_session_cookie(token))
    }

    /// Expired cookie that deletes the session on the client
    #[must_use]
    pub fn clear_session(&self) -> Cookie<'static> {
        self.cookie_factory.create_expired_cookie()
    }

    #[must_use]
    pub fn cookie_secure(&self) -> bool {
        self.cookie_factory.cookie_secure()
    }

    /// Whether a shared secret is available
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.secret.is_some()
    }
}
