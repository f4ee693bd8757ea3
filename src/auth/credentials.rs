use crate::session::token::constant_time_eq;
use crate::settings::AdminSettings;

/// The configured admin username and password
#[derive(Clone)]
pub struct AdminCredentials {
    username: String,
    password: String,
}

impl AdminCredentials {
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    #[must_use]
    pub fn from_settings(settings: &AdminSettings) -> Self {
        Self::new(settings.username.clone(), settings.password.clone())
    }

    #[must_use]
    pub fn is_configured(&self) -> bool {
        !self.username.is_empty() && !self.password.is_empty()
    }

    /// Check a login attempt. Both fields are compared in constant time and both
    /// comparisons always run.
    #[must_use]
    pub fn validate(&self, username: &str, password: &str) -> bool {
        if !self.is_configured() {
            log::error!("Admin credentials are not configured (ADMIN_USERNAME / ADMIN_PASSWORD)");
            return false;
        }

        let username_valid = constant_time_eq(username.as_bytes(), self.username.as_bytes());
        let password_valid = constant_time_eq(password.as_bytes(), self.password.as_bytes());
        username_valid & password_valid
    }
}

impl std::fmt::Debug for AdminCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}
